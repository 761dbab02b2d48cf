//! Analysis errors.

use std::time::Duration;
use thiserror::Error;

/// Why an analysis run produced no diagnostics.
///
/// Errors are values: the session reports them as a failed run and never propagates them to
/// the caller of `poll`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The tool is not installed or cannot be started.
    #[error("analysis tool unavailable: {0}")]
    Unavailable(String),
    /// The run exceeded its deadline and was killed.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
    /// The tool output could not be parsed.
    #[error("malformed tool output: {0}")]
    MalformedOutput(String),
    /// The tool exited with a status outside its accepted set.
    #[error("tool exited with status {code:?}: {stderr}")]
    UnexpectedExit {
        /// Exit code (`None` if terminated by a signal).
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// I/O failure while preparing input or talking to the process.
    #[error("analysis I/O error: {0}")]
    Io(String),
    /// The run was cancelled before it finished.
    #[error("analysis cancelled")]
    Cancelled,
}

impl From<std::io::Error> for AnalysisError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
