use std::path::PathBuf;
use std::time::Duration;

use crate::transport::ExitStatus;

/// Error when a capture configuration is malformed.
///
/// It is always raised before any remote operation takes place.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The buffering mode is not one of `oneshot`, `circular` or `streaming`.
    #[error("invalid value for --buffering-mode: {0:?} (expected one of: oneshot, circular, streaming)")]
    BufferingMode(String),

    /// The category set is empty.
    #[error("empty category set (use \"all\" to enable every category)")]
    EmptyCategories,

    /// Streaming was requested, but no local sink was provided.
    #[error("streaming requested without an output sink")]
    MissingStreamSink,
}

/// Error of the stream bridge.
#[derive(thiserror::Error, Debug)]
pub enum StreamError<E> {
    /// The inbound connection couldn't be accepted.
    #[error("unable to accept incoming trace connection: {0}")]
    Accept(#[source] E),

    /// No inbound connection was made before the deadline.
    #[error("no incoming trace connection after {0:?}")]
    AcceptTimeout(Duration),

    /// The bridge was abandoned before any inbound connection was made.
    #[error("trace stream abandoned before any connection was made")]
    Abandoned,

    /// The trace stream couldn't be copied to the local sink.
    #[error("error writing trace results: {0}")]
    Copy(#[source] std::io::Error),

    /// The bridge task ended without reporting its outcome.
    #[error("trace stream task ended without reporting")]
    Lost,
}

/// Error of a trace capture.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError<E> {
    /// The capture configuration is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A remote session failed.
    #[error("remote session failed: {0}")]
    Session(#[source] E),

    /// The remote trace tool reported a failure.
    #[error("remote trace command failed ({0})")]
    RemoteCommand(ExitStatus),

    /// The trace stream failed.
    #[error(transparent)]
    Stream(#[from] StreamError<E>),
}

/// Error of a file transfer.
#[derive(thiserror::Error, Debug)]
pub enum TransferError<E> {
    /// The remote file couldn't be opened.
    #[error("unable to open remote file {0}: {1}")]
    RemoteOpen(String, #[source] E),

    /// The local file couldn't be created.
    #[error("{0}: {1}")]
    LocalCreate(PathBuf, #[source] std::io::Error),

    /// The bytes couldn't be copied.
    #[error("file copy failed: {0}")]
    Copy(#[source] std::io::Error),
}

/// Error of a clock synchronization.
///
/// When returned, no offset is available.
#[derive(thiserror::Error, Debug)]
pub enum ClockSyncError<E> {
    /// The remote time service couldn't be started or awaited.
    #[error("remote session failed: {0}")]
    Session(#[source] E),

    /// The remote time service has no piped standard input or error.
    #[error("remote time service has no piped stdin/stderr")]
    MissingPipe,

    /// I/O error on the channel with the remote time service.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The remote time service closed its output early.
    #[error("remote time service closed its output")]
    Eof,

    /// The remote time service returned a malformed timestamp.
    #[error("failed to parse timestamp: {0:?}")]
    Parse(String),

    /// The remote time service didn't respond in time.
    #[error("no response from remote time service after {0:?}")]
    Timeout(Duration),

    /// The remote time service didn't exit successfully.
    #[error("remote time service failed ({0})")]
    RemoteExit(ExitStatus),
}

/// Result type of a trace capture.
pub type Result<T, E> = core::result::Result<T, CaptureError<E>>;
