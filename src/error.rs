//! Run-failure taxonomy
//!
//! Every fault here aborts the current run and surfaces whole to the
//! escalation policy; the next scheduled run is the retry unit. State
//! corruption is deliberately absent — the state store recovers from it
//! locally and it never fails a run.

use thiserror::Error;

/// Result type for operations against external collaborators.
pub type CheckResult<T> = Result<T, CheckError>;

/// Faults that abort a run.
#[derive(Debug, Error)]
pub enum CheckError {
    /// An HTTP or SMTP call failed or returned a non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The conversion service rejected the document.
    #[error("conversion rejected: {0}")]
    ConversionRejected(String),

    /// Conversion polling exceeded the ceiling.
    #[error("conversion did not complete within {0} seconds")]
    ConversionTimeout(u64),

    /// The diff service reported an application-level error.
    #[error("remote diff error: {0}")]
    RemoteDiff(String),

    /// Local filesystem trouble while saving or deleting artifacts.
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CheckError {
    fn from(err: reqwest::Error) -> Self {
        CheckError::Transport(err.to_string())
    }
}
