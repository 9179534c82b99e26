use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValidationError;

/// Category sentinel enabling every trace category on the target.
pub const ALL_CATEGORIES: &str = "all";

/// Configuration of a trace capture, providing fine-grained control over the
/// remote `trace record` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Comma separated list of categories, or [ALL_CATEGORIES].
    pub categories: String,

    /// Size of the target trace buffer in MB (`0` uses the target default).
    pub buffer_size: u32,

    /// Buffering mode, validated when the remote command is built.
    pub buffering_mode: String,

    /// Duration of the capture (zero means unbounded).
    pub duration: Duration,

    /// Tracing specification file on the target.
    pub spec_file: Option<String>,

    /// Path on the target where benchmark results are stored.
    pub benchmark_results_file: Option<String>,

    /// Whether the trace is recorded in binary format.
    pub binary: bool,

    /// Whether the trace is streamed back to the host while being recorded.
    pub stream: bool,

    /// Whether the trace output is compressed on the target.
    pub compress: bool,

    /// Whether the traced program keeps running once tracing finished.
    pub detach: bool,

    /// Whether tracing keeps running once the traced program exited.
    pub decouple: bool,

    /// Whether the traced program is launched as a legacy app.
    pub spawn: bool,

    /// Verbosity level forwarded to the remote trace tool.
    pub verbosity: u8,

    /// Program to trace, followed by its arguments.
    pub program: Vec<String>,
}

impl CaptureConfig {
    /// Constructs a new `CaptureConfig` with the following defaults:
    ///
    /// * The given categories
    /// * `oneshot` buffering mode and target default buffer size
    /// * Unbounded duration
    /// * No program to trace
    pub fn new(categories: impl Into<String>) -> Self {
        Self {
            categories: categories.into(),
            buffer_size: 0,
            buffering_mode: BufferingMode::Oneshot.to_string(),
            duration: Duration::ZERO,
            spec_file: None,
            benchmark_results_file: None,
            binary: false,
            stream: false,
            compress: false,
            detach: false,
            decouple: false,
            spawn: false,
            verbosity: 0,
            program: Vec::new(),
        }
    }

    /// Sets the size of the target trace buffer, in MB.
    pub const fn buffer_size(mut self, megabytes: u32) -> Self {
        self.buffer_size = megabytes;
        self
    }

    /// Sets the buffering mode.
    pub fn buffering_mode(mut self, mode: impl Into<String>) -> Self {
        self.buffering_mode = mode.into();
        self
    }

    /// Sets the capture duration (second resolution).
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the tracing specification file.
    pub fn spec_file(mut self, path: impl Into<String>) -> Self {
        self.spec_file = Some(path.into());
        self
    }

    /// Sets the benchmark results file.
    pub fn benchmark_results_file(mut self, path: impl Into<String>) -> Self {
        self.benchmark_results_file = Some(path.into());
        self
    }

    /// Records the trace in binary format.
    pub const fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Streams the trace back to the host while it is being recorded.
    pub const fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Compresses the trace output on the target.
    pub const fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Keeps the traced program running once tracing finished.
    pub const fn detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    /// Keeps tracing once the traced program exited.
    pub const fn decouple(mut self, decouple: bool) -> Self {
        self.decouple = decouple;
        self
    }

    /// Launches the traced program as a legacy app.
    pub const fn spawn(mut self, spawn: bool) -> Self {
        self.spawn = spawn;
        self
    }

    /// Sets the verbosity level forwarded to the remote trace tool.
    pub const fn verbosity(mut self, level: u8) -> Self {
        self.verbosity = level;
        self
    }

    /// Sets the program to trace and its arguments.
    ///
    /// The first element is the program, the others are its arguments.
    pub fn program<I, S>(mut self, program: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into_iter().map(Into::into).collect();
        self
    }
}

/// Buffering strategy of the target trace buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingMode {
    /// Tracing stops once the buffer is full.
    Oneshot,

    /// Oldest records are overwritten once the buffer is full.
    Circular,

    /// The buffer is drained while tracing.
    Streaming,
}

impl BufferingMode {
    /// Name of the mode, as understood by the target.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Oneshot => "oneshot",
            Self::Circular => "circular",
            Self::Streaming => "streaming",
        }
    }
}

impl FromStr for BufferingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oneshot" => Ok(Self::Oneshot),
            "circular" => Ok(Self::Circular),
            "streaming" => Ok(Self::Streaming),
            _ => Err(ValidationError::BufferingMode(s.to_owned())),
        }
    }
}

impl fmt::Display for BufferingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
