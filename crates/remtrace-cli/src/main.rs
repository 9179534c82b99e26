#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use remtrace_cli::{
    CliAction, CliOpts, evaluate_convert, evaluate_fetch, evaluate_record, evaluate_time_sync,
};

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .with_env_var("REMTRACE_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let res = match cli.action {
        CliAction::Record(record) => evaluate_record(record),
        CliAction::TimeSync {
            connection,
            service,
        } => evaluate_time_sync(connection, service),
        CliAction::Fetch {
            connection,
            remote,
            local,
        } => evaluate_fetch(connection, remote, local),
        CliAction::Convert {
            converter,
            output,
            title,
            inputs,
        } => evaluate_convert(converter, output, title, inputs),
    };

    if let Err(e) = res {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
