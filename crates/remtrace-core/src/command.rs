use std::fmt;
use std::net::SocketAddr;

use crate::config::{ALL_CATEGORIES, BufferingMode, CaptureConfig};
use crate::error::ValidationError;

const STREAM_DESTINATION_PREFIX: &str = "--output-file=tcp:";

/// Flag keeping the remote exit status tied to the trace tool rather than
/// the traced program.
pub const CHILD_RESULT_FLAG: &str = "--return-child-result=false";

/// Remote `trace record` invocation, as an ordered list of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    tokens: Vec<String>,

    /// Index of the output destination token, when streaming.
    stream_slot: Option<usize>,
}

impl RemoteCommand {
    /// Builds the remote invocation for the given capture configuration.
    ///
    /// Flags are only emitted when they differ from the target defaults, and
    /// the program to trace (if any) always comes last.
    ///
    /// When streaming is requested, the output destination is left empty
    /// until [set_stream_destination](Self::set_stream_destination) is called.
    pub fn build(config: &CaptureConfig) -> Result<Self, ValidationError> {
        let buffering_mode = config.buffering_mode.parse::<BufferingMode>()?;

        if config.categories.is_empty() {
            return Err(ValidationError::EmptyCategories);
        }

        let mut tokens = vec!["trace".to_owned()];

        match config.verbosity {
            0 => (),
            1 => tokens.push("--verbose=1".to_owned()),
            _ => tokens.push("--verbose=2".to_owned()),
        }

        tokens.push("record".to_owned());

        if let Some(spec_file) = config.spec_file.as_deref().filter(|s| !s.is_empty()) {
            tokens.push(format!("--spec-file={spec_file}"));
        }

        if let Some(results) = config
            .benchmark_results_file
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            tokens.push(format!("--benchmark-results-file={results}"));
        }

        if config.categories != ALL_CATEGORIES {
            tokens.push(format!("--categories={}", config.categories));
        }

        if config.buffer_size != 0 {
            tokens.push(format!("--buffer-size={}", config.buffer_size));
        }

        tokens.push(format!("--buffering-mode={buffering_mode}"));

        if !config.duration.is_zero() {
            tokens.push(format!("--duration={}", config.duration.as_secs()));
        }

        if config.binary {
            tokens.push("--binary".to_owned());
        }

        if config.compress {
            tokens.push("--compress".to_owned());
        }

        let stream_slot = config.stream.then(|| {
            tokens.push(STREAM_DESTINATION_PREFIX.to_owned());
            tokens.len() - 1
        });

        if config.detach {
            tokens.push("--detach".to_owned());
        }

        if config.decouple {
            tokens.push("--decouple".to_owned());
        }

        if config.spawn {
            tokens.push("--spawn".to_owned());
        }

        if !config.program.is_empty() {
            tokens.push(CHILD_RESULT_FLAG.to_owned());
            tokens.extend(config.program.iter().cloned());
        }

        Ok(Self {
            tokens,
            stream_slot,
        })
    }

    /// Points the trace output of the remote invocation to the given address.
    ///
    /// Does nothing if the command wasn't built with streaming enabled.
    pub fn set_stream_destination(&mut self, addr: SocketAddr) {
        if let Some(slot) = self.stream_slot {
            self.tokens[slot] = format!("{STREAM_DESTINATION_PREFIX}{addr}");
        }
    }

    /// Whether the output of the remote invocation is streamed.
    pub const fn is_streaming(&self) -> bool {
        self.stream_slot.is_some()
    }

    /// Tokens of the remote invocation.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Renders the command line run by the remote shell, with every token
/// quoted so that it reaches the trace tool unchanged.
impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(&self.tokens))
    }
}
