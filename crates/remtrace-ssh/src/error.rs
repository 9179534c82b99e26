use std::path::PathBuf;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The target address is malformed.
    #[error("invalid target address: {0:?}")]
    InvalidTarget(String),

    /// The target couldn't be reached.
    #[error("unable to reach {0}: {1}")]
    Dial(String, #[source] std::io::Error),

    /// The target didn't answer before the deadline.
    #[error("connection to {0} timed out")]
    DialTimeout(String),

    /// The SSH handshake failed.
    #[error("SSH handshake failed: {0}")]
    Handshake(#[source] ssh2::Error),

    /// The private key couldn't be read.
    #[error("private key {0}: {1}")]
    Key(PathBuf, #[source] std::io::Error),

    /// The target rejected the credential.
    #[error("authentication as {0:?} failed: {1}")]
    Auth(String, #[source] ssh2::Error),

    /// The target didn't accept the credential without reporting an error.
    #[error("authentication as {0:?} was not accepted")]
    NotAuthenticated(String),

    /// The target presented an unexpected host key.
    #[error("host key mismatch for {host} (expected {expected}, got {actual})")]
    HostKeyMismatch {
        /// Host being verified.
        host: String,

        /// Fingerprint the policy expected.
        expected: String,

        /// Fingerprint the target presented.
        actual: String,
    },

    /// The target is not listed in the known hosts file.
    #[error("host {0} is not listed in the known hosts file")]
    UnknownHost(String),

    /// The target didn't present any host key.
    #[error("host key unavailable")]
    HostKeyUnavailable,

    /// The known hosts file couldn't be loaded.
    #[error("known hosts file {0}: {1}")]
    KnownHosts(PathBuf, #[source] ssh2::Error),

    /// The connection was closed.
    #[error("connection closed")]
    Closed,

    /// Error from the [ssh2] crate.
    #[error(transparent)]
    Ssh(#[from] ssh2::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Tokio task join error.
    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
