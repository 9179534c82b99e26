//! Crate implementing the CLI commands.

mod cli;
mod convert;
mod fetch;
mod profile;
mod record;
mod sync;

use remtrace_core::transport::Transport;
use remtrace_ssh::Connection;
use tracing::level_filters::LevelFilter;

pub use self::cli::{CliAction, CliCapture, CliConnection, CliOpts, CliRecord, DEFAULT_CATEGORIES};
pub use self::convert::{convert_trace, evaluate_convert};
pub use self::fetch::evaluate_fetch;
pub use self::profile::Profile;
pub use self::record::{DEFAULT_REMOTE_FILE, evaluate_record};
pub use self::sync::evaluate_time_sync;

fn runtime() -> miette::Result<tokio::runtime::Runtime> {
    use miette::IntoDiagnostic;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Connects to the target of the profile, runs `op`, then closes the
/// connection whatever the outcome.
async fn with_connection<T>(
    profile: &Profile,
    op: impl AsyncFnOnce(&Connection) -> miette::Result<T>,
) -> miette::Result<T> {
    let connection = profile.connect().await?;

    let res = op(&connection).await;

    if let Err(e) = connection.close().await {
        tracing::warn!("unable to close connection: {e}");
    }

    res
}

/// Verbosity of the remote trace tool, following the local log level.
fn remote_verbosity() -> u8 {
    let level = LevelFilter::current();

    if level >= LevelFilter::TRACE {
        2
    } else if level >= LevelFilter::DEBUG {
        1
    } else {
        0
    }
}
