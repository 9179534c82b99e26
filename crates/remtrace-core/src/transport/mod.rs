mod status;

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::status::ExitStatus;

/// Trait implementing an authenticated connection to a remote target.
///
/// A single transport hosts any number of independent sessions (command
/// executions, file reads, spawned processes, tunnels), each opened on
/// demand by the methods below.
///
/// # Note
///
/// Once [close](Self::close) was called, every method returns an error.
pub trait Transport {
    /// Listener returned by [open_tunnel](Self::open_tunnel).
    type Listener: TunnelListener<Error = Self::Error>;

    /// Process returned by [spawn](Self::spawn).
    type Process: RemoteProcess<Error = Self::Error>;

    /// Readable handle over a remote file.
    type File: AsyncRead + Unpin;

    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the given command line on the target until it exits.
    ///
    /// The standard streams of the remote command are connected to the
    /// standard streams of the calling process. Concurrent executions take
    /// turns on the standard input of the calling process: only one of them
    /// receives it at a time.
    fn execute(&self, command: &str) -> impl Future<Output = Result<ExitStatus, Self::Error>>;

    /// Opens a listener reachable from the target through this transport.
    ///
    /// `bind` is the address the listener is bound to **on the target side**.
    /// A port of `0` lets the target pick one.
    fn open_tunnel(
        &self,
        bind: SocketAddr,
    ) -> impl Future<Output = Result<Self::Listener, Self::Error>>;

    /// Opens a remote file for reading.
    fn open_file(&self, path: &str) -> impl Future<Output = Result<Self::File, Self::Error>>;

    /// Starts the given command line on the target, with its standard input
    /// and standard error piped back to the caller.
    fn spawn(&self, command: &str) -> impl Future<Output = Result<Self::Process, Self::Error>>;

    /// Releases the transport.
    ///
    /// Calling this function more than once has no effect.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Trait implementing a listener opened through a [Transport].
pub trait TunnelListener: Send + 'static {
    /// Stream of an accepted connection.
    type Stream: AsyncRead + Unpin + Send;

    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the address a remote producer should connect to.
    fn address(&self) -> SocketAddr;

    /// Waits for the next inbound connection.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send;
}

/// Trait implementing a process running on the target.
pub trait RemoteProcess {
    /// Writable handle over the standard input of the process.
    type Stdin: AsyncWrite + Unpin;

    /// Readable handle over the standard error of the process.
    type Stderr: AsyncRead + Unpin;

    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The handle for writing to the standard input of the process.
    ///
    /// Returns `None` if it was previously taken.
    fn stdin(&mut self) -> Option<Self::Stdin>;

    /// The handle for reading from the standard error of the process.
    ///
    /// Returns `None` if it was previously taken.
    fn stderr(&mut self) -> Option<Self::Stderr>;

    /// Waits for the process to exit.
    fn wait(self) -> impl Future<Output = Result<ExitStatus, Self::Error>>;
}
