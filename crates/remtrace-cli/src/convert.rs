use std::path::{Path, PathBuf};

use miette::IntoDiagnostic;
use tokio::process::Command;

/// Runs the subcommand for converting trace files.
pub fn evaluate_convert(
    converter: PathBuf,
    output: PathBuf,
    title: Option<String>,
    inputs: Vec<PathBuf>,
) -> miette::Result<()> {
    crate::runtime()?
        .block_on(async { convert_trace(&converter, &output, title.as_deref(), &inputs).await })
}

/// Converts trace files by invoking an external converter.
///
/// The converter is invoked as
/// `<converter> --output=<output> [--title=<title>] <inputs>...`, with the
/// standard streams of the current process.
pub async fn convert_trace(
    converter: &Path,
    output: &Path,
    title: Option<&str>,
    inputs: &[PathBuf],
) -> miette::Result<()> {
    let args = converter_args(output, title, inputs);

    tracing::info!("converting {inputs:?} to {}", output.display());
    tracing::debug!("running: {} {}", converter.display(), args.join(" "));

    let status = Command::new(converter)
        .args(&args)
        .status()
        .await
        .into_diagnostic()?;

    if !status.success() {
        miette::bail!(
            "conversion failed ({status}), invoked as: {} {}",
            converter.display(),
            args.join(" ")
        );
    }

    Ok(())
}

fn converter_args(output: &Path, title: Option<&str>, inputs: &[PathBuf]) -> Vec<String> {
    let mut args = vec![format!("--output={}", output.display())];

    if let Some(title) = title {
        args.push(format!("--title={title}"));
    }

    args.extend(inputs.iter().map(|input| input.display().to_string()));
    args
}
