use std::path::PathBuf;

use miette::IntoDiagnostic;
use remtrace_core::fetch;

use crate::cli::CliConnection;
use crate::profile::Profile;

/// Runs the subcommand for copying a file from the target.
pub fn evaluate_fetch(
    connection: CliConnection,
    remote: String,
    local: PathBuf,
) -> miette::Result<()> {
    let profile = Profile::from_cli(&connection)?;

    let n_bytes = crate::runtime()?.block_on(crate::with_connection(
        &profile,
        async |connection| fetch(connection, &remote, &local).await.into_diagnostic(),
    ))?;

    tracing::info!(n_bytes, "{remote} copied to {}", local.display());

    Ok(())
}
