use std::path::PathBuf;

/// Comma separated list of categories traced when none is specified.
pub const DEFAULT_CATEGORIES: &str = "app,benchmark,gfx,input,kernel:meta,kernel:sched,ledger,magma,modular,motown,view,flutter,dart,dart:compiler,dart:dart,dart:debugger,dart:embedder,dart:gc,dart:isolate,dart:profiler,dart:vm";

/// The remtrace capture tool.
#[derive(clap::Parser)]
pub struct CliOpts {
    /// The command to run.
    #[clap(subcommand)]
    pub action: CliAction,
}

/// The command to run.
#[derive(clap::Subcommand)]
pub enum CliAction {
    /// Command to record a trace on the target.
    Record(CliRecord),

    /// Command to estimate the offset between the host and target clocks.
    TimeSync {
        /// Connection to the target.
        #[clap(flatten)]
        connection: CliConnection,

        /// Command line of the time service on the target.
        #[clap(long, default_value = remtrace_core::DEFAULT_TIME_SERVICE)]
        service: String,
    },

    /// Command to copy a file from the target.
    Fetch {
        /// Connection to the target.
        #[clap(flatten)]
        connection: CliConnection,

        /// Path of the file on the target.
        remote: String,

        /// Path where to store the file on the host.
        local: PathBuf,
    },

    /// Command to convert trace files with an external converter.
    Convert {
        /// The converter executable (e.g. `trace2html`).
        #[clap(long, value_name = "PATH")]
        converter: PathBuf,

        /// Path of the converted trace.
        #[clap(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Title of the converted trace.
        #[clap(long)]
        title: Option<String>,

        /// Trace files to convert.
        #[clap(required = true)]
        inputs: Vec<PathBuf>,
    },
}

/// Configuration of a trace recording.
#[derive(clap::Parser)]
pub struct CliRecord {
    /// Connection to the target.
    #[clap(flatten)]
    pub connection: CliConnection,

    /// Configuration of the capture.
    #[clap(flatten)]
    pub capture: CliCapture,

    /// Path where to store the trace on the host.
    #[clap(short, long, value_name = "PATH", default_value = "trace.json")]
    pub output: PathBuf,

    /// Path of the trace file written on the target, when not streaming.
    ///
    /// Defaults to `/data/trace.json` (or `/data/trace.json.gz` when
    /// compressed).
    #[clap(long, value_name = "PATH")]
    pub remote_file: Option<String>,

    /// Estimates the offset between the host and target clocks before
    /// recording.
    #[clap(long)]
    pub sync_clock: bool,

    /// Converter to run on the recorded trace (e.g. `trace2html`).
    #[clap(long, value_name = "PATH", requires = "converted")]
    pub converter: Option<PathBuf>,

    /// Path of the converted trace.
    #[clap(long, value_name = "PATH", requires = "converter")]
    pub converted: Option<PathBuf>,

    /// Title of the converted trace.
    #[clap(long)]
    pub title: Option<String>,

    /// Program to trace on the target, followed by its arguments.
    #[clap(last = true)]
    pub program: Vec<String>,
}

/// Configuration of the connection to the target.
#[derive(clap::Parser)]
pub struct CliConnection {
    /// Connection profile (KDL format).
    ///
    /// If it ends with `.kdl`, it is treated as a path to a profile file.
    /// Otherwise it is directly parsed as inline KDL-formatted profile.
    #[clap(short, long, value_name = "CONTENT/PATH")]
    pub profile: Option<String>,

    /// Target address (`host`, `host:port` or `[ipv6]:port`), overriding the
    /// profile.
    #[clap(short, long)]
    pub target: Option<String>,

    /// Private key file, overriding the profile.
    #[clap(short, long, value_name = "PATH")]
    pub key: Option<PathBuf>,
}

/// Configuration of the remote trace capture.
#[derive(clap::Parser)]
pub struct CliCapture {
    /// Comma separated list of categories to trace ("all" for all
    /// categories).
    #[clap(long, default_value = DEFAULT_CATEGORIES)]
    pub categories: String,

    /// Size of trace buffer in MB.
    #[clap(long, default_value_t = 0)]
    pub buffer_size: u32,

    /// Buffering mode (one of: oneshot, circular, streaming).
    #[clap(long, default_value = "oneshot")]
    pub buffering_mode: String,

    /// Duration of trace capture, in seconds.
    #[clap(long, value_name = "SECONDS", default_value_t = 0)]
    pub duration: u64,

    /// Tracing specification file on the target.
    #[clap(long, value_name = "PATH")]
    pub spec_file: Option<String>,

    /// Relative file path on the target for storing benchmark results.
    #[clap(long, value_name = "PATH")]
    pub benchmark_results_file: Option<String>,

    /// Capture trace in binary format on the target.
    #[clap(long)]
    pub binary: bool,

    /// Stream trace output to the host, instead of saving it on the target
    /// and then copying it.
    #[clap(long)]
    pub stream: bool,

    /// Compress the trace output before writing it on the target.
    #[clap(long)]
    pub compress: bool,

    /// Don't stop the traced program when tracing finished.
    #[clap(long)]
    pub detach: bool,

    /// Don't stop tracing when the traced program exits.
    #[clap(long)]
    pub decouple: bool,

    /// Run the traced program as a legacy app.
    #[clap(long)]
    pub spawn: bool,
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}
