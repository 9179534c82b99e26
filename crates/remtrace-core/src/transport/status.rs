use std::fmt;

/// Exit status of a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    code: Option<i32>,
    signal: Option<String>,
}

impl ExitStatus {
    /// Exit status of a command that exited with the given code.
    pub const fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Exit status of a command that was terminated by a signal.
    pub fn from_signal(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }

    /// Whether the command exited successfully.
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Exit code of the command, if it exited normally.
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// Name of the signal that terminated the command, if any.
    pub fn signal(&self) -> Option<&str> {
        self.signal.as_deref()
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.signal) {
            (Some(code), _) => write!(f, "exit code: {code}"),
            (None, Some(signal)) => write!(f, "signal: {signal}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}
