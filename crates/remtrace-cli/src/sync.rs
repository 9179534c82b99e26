use std::io::Write;

use miette::IntoDiagnostic;
use remtrace_core::{ClockSyncOptions, sync_clock};

use crate::cli::CliConnection;
use crate::profile::Profile;

/// Runs the subcommand for estimating the offset between the host and target
/// clocks.
pub fn evaluate_time_sync(connection: CliConnection, service: String) -> miette::Result<()> {
    let profile = Profile::from_cli(&connection)?;

    let options = ClockSyncOptions {
        command: service,
        response_timeout: profile.sync_timeout(),
    };

    let res = crate::runtime()?.block_on(crate::with_connection(
        &profile,
        async |connection| sync_clock(connection, &options).await.into_diagnostic(),
    ))?;

    writeln!(
        std::io::stdout(),
        "offset: {} (round trip: {:?})",
        res.offset,
        res.delta
    )
    .into_diagnostic()
}
