use std::future::Future;
use std::io::{self, Read, Write};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Delay between two attempts of an operation that would have blocked.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Repeats a non-blocking libssh2 operation until it completes.
pub(crate) async fn retry<T>(
    mut op: impl FnMut() -> Result<T, ssh2::Error>,
) -> Result<T, ssh2::Error> {
    loop {
        match op() {
            Err(e) if would_block(&e) => tokio::time::sleep(POLL_INTERVAL).await,
            res => return res,
        }
    }
}

fn would_block(e: &ssh2::Error) -> bool {
    matches!(e.code(), ssh2::ErrorCode::Session(LIBSSH2_ERROR_EAGAIN))
}

const LIBSSH2_ERROR_EAGAIN: i32 = -37;

/// Async adapter over a non-blocking libssh2 handle.
///
/// Operations that would block are attempted again after a short delay.
pub struct Pipe<T> {
    inner: T,
    backoff: Pin<Box<Sleep>>,
}

impl<T> Pipe<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            backoff: Box::pin(tokio::time::sleep(Duration::ZERO)),
        }
    }

    /// Schedules a wake-up for the next attempt.
    fn poll_backoff(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.backoff.as_mut().reset(Instant::now() + POLL_INTERVAL);
        self.backoff.as_mut().poll(cx)
    }

    fn poll_io<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut op: impl FnMut(&mut T) -> io::Result<R>,
    ) -> Poll<io::Result<R>> {
        loop {
            match op(&mut self.inner) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => ready!(self.poll_backoff(cx)),
                res => return Poll::Ready(res),
            }
        }
    }
}

impl<T: Read + Unpin> AsyncRead for Pipe<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let n = ready!(
            self.get_mut()
                .poll_io(cx, |inner| inner.read(buf.initialize_unfilled()))
        )?;

        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for Pipe<ChannelStdin> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().poll_io(cx, |stdin| stdin.write(buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_io(cx, |stdin| stdin.flush())
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_io(cx, |stdin| stdin.send_eof())
    }
}

/// Standard input of a remote command.
///
/// Shutting it down sends an end-of-file to the command.
pub struct ChannelStdin(Arc<Mutex<ssh2::Channel>>);

impl ChannelStdin {
    pub(crate) fn new(channel: Arc<Mutex<ssh2::Channel>>) -> Self {
        Self(channel)
    }

    fn send_eof(&mut self) -> io::Result<()> {
        lock(&self.0).send_eof().map_err(io::Error::from)
    }
}

impl Write for ChannelStdin {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).write(buf)
    }

    // libssh2 sends on write, and its own flush discards unread input
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Locks a channel shared between the handles of a remote command.
pub(crate) fn lock(channel: &Mutex<ssh2::Channel>) -> MutexGuard<'_, ssh2::Channel> {
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}
