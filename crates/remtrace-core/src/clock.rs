use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ClockSyncError;
use crate::transport::{RemoteProcess, Transport};

/// Number of timestamp requests sent to the remote time service.
pub const SYNC_ROUNDS: usize = 10;

/// Command line starting the remote time service.
pub const DEFAULT_TIME_SERVICE: &str = "trace time";

const TIME_REQUEST: &[u8] = b"t";
const QUIT_REQUEST: &[u8] = b"q";

/// Source of local wall-clock time.
pub trait Clock {
    /// Returns the current local time.
    fn now(&self) -> SystemTime;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Signed difference between the local and the remote clock.
///
/// A positive offset means the local clock is ahead of the remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockOffset(i64);

impl ClockOffset {
    /// Creates an offset from a signed number of nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the offset as a signed number of nanoseconds.
    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Converts a remote timestamp into the local time base.
    pub fn to_local(&self, remote: SystemTime) -> SystemTime {
        let magnitude = Duration::from_nanos(self.0.unsigned_abs());

        if self.0 >= 0 {
            remote + magnitude
        } else {
            remote - magnitude
        }
    }

    fn between(local: SystemTime, remote_nanos: i64) -> Self {
        Self(epoch_nanos(local).saturating_sub(remote_nanos))
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "+" };
        write!(f, "{sign}{:?}", Duration::from_nanos(self.0.unsigned_abs()))
    }
}

/// Outcome of a clock synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSyncResult {
    /// Offset between the local and the remote clock.
    pub offset: ClockOffset,

    /// Shortest round trip observed, from which the offset was derived.
    pub delta: Duration,
}

/// Configuration of a clock synchronization.
#[derive(Debug, Clone)]
pub struct ClockSyncOptions {
    /// Command line starting the remote time service.
    pub command: String,

    /// Maximum time to wait for each line of the remote time service.
    pub response_timeout: Option<Duration>,
}

impl Default for ClockSyncOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_TIME_SERVICE.to_owned(),
            response_timeout: None,
        }
    }
}

/// Estimates the offset between the local and the remote clock.
///
/// The remote time service is sampled [SYNC_ROUNDS] times, and the offset is
/// derived from the sample with the shortest round trip, assuming the remote
/// timestamp was taken halfway through it.
///
/// # Note
///
/// The remote time service must have exited successfully for a result to be
/// returned.
pub async fn sync_clock<T: Transport>(
    transport: &T,
    options: &ClockSyncOptions,
) -> Result<ClockSyncResult, ClockSyncError<T::Error>> {
    sync_clock_with(transport, options, &SystemClock).await
}

/// Same as [sync_clock], using the given local clock.
#[tracing::instrument(name = "ClockSync", skip_all, fields(command = %options.command))]
pub async fn sync_clock_with<T: Transport, C: Clock>(
    transport: &T,
    options: &ClockSyncOptions,
    clock: &C,
) -> Result<ClockSyncResult, ClockSyncError<T::Error>> {
    tracing::debug!("running: {}", options.command);

    let mut process = transport
        .spawn(&options.command)
        .await
        .map_err(ClockSyncError::Session)?;

    let (Some(stdin), Some(stderr)) = (process.stdin(), process.stderr()) else {
        return Err(ClockSyncError::MissingPipe);
    };

    let sampler = Sampler {
        requests: stdin,
        responses: BufReader::new(stderr),
        response_timeout: options.response_timeout,
    };

    let res = sampler.run::<C, T::Error>(clock).await?;

    let status = process.wait().await.map_err(ClockSyncError::Session)?;
    if !status.success() {
        return Err(ClockSyncError::RemoteExit(status));
    }

    tracing::info!(offset = %res.offset, delta = ?res.delta, "clocks synchronized");

    Ok(res)
}

/// Channel with the remote time service.
struct Sampler<W, R> {
    requests: W,
    responses: R,
    response_timeout: Option<Duration>,
}

impl<W, R> Sampler<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    async fn run<C: Clock, E>(mut self, clock: &C) -> Result<ClockSyncResult, ClockSyncError<E>> {
        // usage banner of the time service
        self.read_line::<E>().await?;

        let mut best = None::<ClockSyncResult>;

        for round in 1..=SYNC_ROUNDS {
            let sent = clock.now();
            self.requests.write_all(TIME_REQUEST).await?;
            self.requests.flush().await?;

            let line = self.read_line::<E>().await?;
            let received = clock.now();

            let remote_nanos = parse_timestamp::<E>(&line)?;
            let rtt = received.duration_since(sent).unwrap_or_default();

            if best.is_some_and(|best| rtt >= best.delta) {
                tracing::trace!(round, ?rtt, "sample discarded");
                continue;
            }

            let offset = ClockOffset::between(sent + rtt / 2, remote_nanos);
            tracing::debug!(round, ?rtt, %offset, "new best sample");

            best = Some(ClockSyncResult { offset, delta: rtt });
        }

        self.requests.write_all(QUIT_REQUEST).await?;
        self.requests.shutdown().await?;

        best.ok_or(ClockSyncError::Eof)
    }

    async fn read_line<E>(&mut self) -> Result<String, ClockSyncError<E>> {
        let mut buf = Vec::new();

        let n = match self.response_timeout {
            Some(timeout) => {
                tokio::time::timeout(timeout, self.responses.read_until(b'\n', &mut buf))
                    .await
                    .map_err(|_| ClockSyncError::<E>::Timeout(timeout))??
            }
            None => self.responses.read_until(b'\n', &mut buf).await?,
        };

        if n == 0 || buf.last() != Some(&b'\n') {
            return Err(ClockSyncError::Eof);
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Parses a timestamp in microseconds since epoch, into nanoseconds since epoch.
fn parse_timestamp<E>(line: &str) -> Result<i64, ClockSyncError<E>> {
    let text = line.trim();

    parse_decimal_micros(text)
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|us| us.is_finite())
                .map(|us| (us * 1000.0).round() as i64)
        })
        .ok_or_else(|| ClockSyncError::<E>::Parse(text.to_owned()))
}

/// Exact conversion of `[-]digits[.digits]` microseconds into nanoseconds.
///
/// `f64` cannot hold nanoseconds since epoch without losing precision.
fn parse_decimal_micros(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };

    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));

    if int.is_empty() && frac.is_empty()
        || !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let int_nanos = match int {
        "" => 0,
        int => int.parse::<i64>().ok()?.checked_mul(1000)?,
    };

    let frac_nanos = frac
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0, |acc, d| acc * 10 + i64::from(d - b'0'));

    let round_up = frac.as_bytes().get(3).is_some_and(|d| *d >= b'5');

    let nanos = int_nanos.checked_add(frac_nanos + i64::from(round_up))?;

    Some(if negative { -nanos } else { nanos })
}

fn epoch_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |n| -n),
    }
}
