use std::fmt;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use remtrace_core::transport::{ExitStatus, Transport};
use ssh2::Session;

use crate::error::{Error, Result};
use crate::pipe::{Pipe, retry};
use crate::process::Process;
use crate::trust::TrustPolicy;
use crate::tunnel::Listener;

/// Port of the SSH service when none is specified.
pub const DEFAULT_PORT: u16 = 22;

/// Network location of the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or IP address.
    pub host: String,

    /// Port of the SSH service.
    pub port: u16,
}

impl Target {
    /// Creates a target from its host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for Target {
    type Err = Error;

    /// Parses `host`, `host:port`, a bare IPv6 address, or `[ipv6]:port`.
    ///
    /// IPv6 addresses may carry a zone (e.g. `fe80::1%eth0`), which is kept in
    /// the host.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTarget(s.to_owned());

        if let Ok(SocketAddr::V4(addr)) = s.parse::<SocketAddr>() {
            return Ok(Self::new(addr.ip().to_string(), addr.port()));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, port) = rest.split_once(']').ok_or_else(invalid)?;
            let host = ipv6_host(host).ok_or_else(invalid)?;

            let port = match port {
                "" => DEFAULT_PORT,
                port => port
                    .strip_prefix(':')
                    .and_then(|port| port.parse().ok())
                    .ok_or_else(invalid)?,
            };

            return Ok(Self::new(host, port));
        }

        if let Some(host) = ipv6_host(s) {
            return Ok(Self::new(host, DEFAULT_PORT));
        }

        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
            None => (s, DEFAULT_PORT),
        };

        if host.is_empty() || host.contains([':', '[', ']', '%', ' ']) {
            return Err(invalid());
        }

        Ok(Self::new(host, port))
    }
}

/// Normalizes an IPv6 address with an optional `%zone` suffix.
fn ipv6_host(s: &str) -> Option<String> {
    let (addr, zone) = match s.split_once('%') {
        Some((addr, zone)) => (addr, Some(zone)),
        None => (s, None),
    };

    let addr = addr.parse::<Ipv6Addr>().ok()?;

    match zone {
        None => Some(addr.to_string()),
        Some(zone)
            if !zone.is_empty()
                && zone
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) =>
        {
            Some(format!("{addr}%{zone}"))
        }
        Some(_) => None,
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Public-key credential used to authenticate on the target.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Remote user name.
    pub user: String,

    /// Path of the private key file.
    pub private_key: PathBuf,

    /// Passphrase of the private key, if encrypted.
    pub passphrase: Option<String>,
}

/// Options for establishing a [Connection].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// How the identity of the target is verified.
    pub trust: TrustPolicy,

    /// Deadline for reaching and authenticating on the target.
    pub timeout: Option<Duration>,
}

/// Authenticated SSH connection to a target.
///
/// Every [Transport] operation opens its own channel on this connection.
pub struct Connection {
    session: Session,
    target: Target,
    state: State,
}

/// Open/closed state of a [Connection].
#[derive(Debug, Default)]
struct State {
    closed: AtomicBool,
}

impl State {
    /// Fails if the connection was closed.
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        Ok(())
    }

    /// Marks the connection as closed.
    ///
    /// Returns `false` if it already was.
    fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

impl Connection {
    /// Connects and authenticates to the given target.
    #[tracing::instrument(name = "Connect", skip_all, fields(remote = %target))]
    pub async fn connect(
        target: Target,
        credential: Credential,
        options: ConnectOptions,
    ) -> Result<Self> {
        let address = target.to_string();
        let connecting = tokio::net::TcpStream::connect((target.host.as_str(), target.port));

        let tcp = match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| Error::DialTimeout(address.clone()))?,
            None => connecting.await,
        }
        .map_err(|e| Error::Dial(address, e))?;

        // libssh2 drives the socket itself
        let tcp = tcp.into_std()?;
        tcp.set_nonblocking(false)?;

        let (session, target) = tokio::task::spawn_blocking(move || {
            establish(tcp, &target, &credential, &options).map(|session| (session, target))
        })
        .await??;

        session.set_blocking(false);

        tracing::info!("connected");

        Ok(Self {
            session,
            target,
            state: State::default(),
        })
    }

    /// The target of this connection.
    pub fn target(&self) -> &Target {
        &self.target
    }

    fn ensure_open(&self) -> Result<()> {
        self.state.ensure_open()
    }
}

/// Performs the blocking handshake and authentication.
fn establish(
    tcp: std::net::TcpStream,
    target: &Target,
    credential: &Credential,
    options: &ConnectOptions,
) -> Result<Session> {
    std::fs::metadata(&credential.private_key)
        .map_err(|e| Error::Key(credential.private_key.clone(), e))?;

    let mut session = Session::new().map_err(Error::Handshake)?;
    session.set_tcp_stream(tcp);

    if let Some(timeout) = options.timeout {
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    }

    session.handshake().map_err(Error::Handshake)?;

    options.trust.verify(&session, &target.host, target.port)?;

    session
        .userauth_pubkey_file(
            &credential.user,
            None,
            &credential.private_key,
            credential.passphrase.as_deref(),
        )
        .map_err(|e| Error::Auth(credential.user.clone(), e))?;

    if !session.authenticated() {
        return Err(Error::NotAuthenticated(credential.user.clone()));
    }

    session.set_timeout(0);

    Ok(session)
}

impl Transport for Connection {
    type Listener = Listener;
    type Process = Process;
    type File = Pipe<ssh2::File>;
    type Error = Error;

    async fn execute(&self, command: &str) -> Result<ExitStatus> {
        self.ensure_open()?;
        crate::exec::run(&self.session, command).await
    }

    async fn open_tunnel(&self, bind: SocketAddr) -> Result<Listener> {
        self.ensure_open()?;

        let host = bind.ip().to_string();
        let (inner, port) = retry(|| {
            self.session
                .channel_forward_listen(bind.port(), Some(host.as_str()), None)
        })
        .await?;

        let address = SocketAddr::new(bind.ip(), port);
        tracing::debug!(%address, "remote listener opened");

        Ok(Listener::new(inner, address))
    }

    async fn open_file(&self, path: &str) -> Result<Pipe<ssh2::File>> {
        self.ensure_open()?;

        let sftp = retry(|| self.session.sftp()).await?;
        let file = retry(|| sftp.open(Path::new(path))).await?;

        Ok(Pipe::new(file))
    }

    async fn spawn(&self, command: &str) -> Result<Process> {
        self.ensure_open()?;
        Process::spawn(&self.session, command).await
    }

    async fn close(&self) -> Result<()> {
        if !self.state.close() {
            return Ok(());
        }

        tracing::debug!(remote = %self.target, "closing connection");

        retry(|| self.session.disconnect(None, "bye", None)).await?;
        Ok(())
    }
}
