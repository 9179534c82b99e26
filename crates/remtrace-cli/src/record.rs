use std::path::Path;
use std::time::Duration;

use miette::IntoDiagnostic;
use remtrace_core::{
    CaptureConfig, CaptureOptions, ClockSyncOptions, RemoteCommand, capture, fetch, sync_clock,
};
use remtrace_ssh::Connection;

use crate::cli::{CliCapture, CliRecord};
use crate::convert::convert_trace;
use crate::profile::Profile;

/// Trace file written by the target when the output is not streamed.
pub const DEFAULT_REMOTE_FILE: &str = "/data/trace.json";

/// Runs the subcommand for recording a trace.
pub fn evaluate_record(record: CliRecord) -> miette::Result<()> {
    let profile = Profile::from_cli(&record.connection)?;

    let config = capture_config(
        &record.capture,
        record.program.clone(),
        crate::remote_verbosity(),
    );

    // configuration errors are reported before connecting
    RemoteCommand::build(&config).into_diagnostic()?;

    crate::runtime()?.block_on(async {
        crate::with_connection(&profile, async |connection| {
            if record.sync_clock {
                let options = ClockSyncOptions {
                    response_timeout: profile.sync_timeout(),
                    ..ClockSyncOptions::default()
                };

                let res = sync_clock(connection, &options).await.into_diagnostic()?;
                tracing::info!(offset = %res.offset, delta = ?res.delta, "clocks synchronized");
            }

            let options = CaptureOptions {
                accept_timeout: profile.accept_timeout(),
                ..CaptureOptions::default()
            };

            let remote_file = record
                .remote_file
                .clone()
                .unwrap_or_else(|| default_remote_file(config.compress));

            record_trace(connection, &config, &options, &remote_file, &record.output).await
        })
        .await?;

        if let Some((converter, converted)) = record.converter.zip(record.converted) {
            convert_trace(
                &converter,
                &converted,
                record.title.as_deref(),
                &[record.output],
            )
            .await?;
        }

        Ok(())
    })
}

async fn record_trace(
    connection: &Connection,
    config: &CaptureConfig,
    options: &CaptureOptions,
    remote_file: &str,
    output: &Path,
) -> miette::Result<()> {
    if config.stream {
        let sink = tokio::fs::File::create(output).await.into_diagnostic()?;

        let outcome = capture(connection, config, options, Some(sink))
            .await
            .into_diagnostic()?;

        tracing::info!(
            n_bytes = outcome.streamed_bytes,
            "trace streamed to {}",
            output.display()
        );
    } else {
        capture(connection, config, options, None::<tokio::fs::File>)
            .await
            .into_diagnostic()?;

        let n_bytes = fetch(connection, remote_file, output)
            .await
            .into_diagnostic()?;

        tracing::info!(n_bytes, "trace copied to {}", output.display());
    }

    Ok(())
}

fn capture_config(cli: &CliCapture, program: Vec<String>, verbosity: u8) -> CaptureConfig {
    let mut config = CaptureConfig::new(&cli.categories)
        .buffer_size(cli.buffer_size)
        .buffering_mode(&cli.buffering_mode)
        .duration(Duration::from_secs(cli.duration))
        .binary(cli.binary)
        .stream(cli.stream)
        .compress(cli.compress)
        .detach(cli.detach)
        .decouple(cli.decouple)
        .spawn(cli.spawn)
        .verbosity(verbosity)
        .program(program);

    config.spec_file.clone_from(&cli.spec_file);
    config
        .benchmark_results_file
        .clone_from(&cli.benchmark_results_file);

    config
}

fn default_remote_file(compress: bool) -> String {
    if compress {
        format!("{DEFAULT_REMOTE_FILE}.gz")
    } else {
        DEFAULT_REMOTE_FILE.to_owned()
    }
}
