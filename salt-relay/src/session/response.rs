//! Response type for command execution results.

use std::time::Duration;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command line that was sent.
    pub command: String,

    /// The command output (sanitized - echo, password prompt and trailing prompt removed).
    pub result: String,

    /// The raw output before sanitizing.
    pub raw_result: String,

    /// Exit status reported by the remote, if any.
    ///
    /// Interactive sessions stop reading at the shell prompt and never see one.
    pub exit_status: Option<u32>,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a new response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        exit_status: Option<u32>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            exit_status,
            elapsed,
        }
    }

    /// Check if the response indicates success.
    ///
    /// A missing exit status counts as success.
    pub fn is_success(&self) -> bool {
        self.exit_status.is_none_or(|status| status == 0)
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
