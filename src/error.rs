// Error taxonomy for every bridge call. Backend failures are kept apart from
// failures of the bridge itself so callers can branch on the kind instead of
// matching message text.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The executor binary could not be located or spawned.
    #[error("internal error (no executor at {}): not found", .path.display())]
    ExecutorNotFound { path: PathBuf },

    /// The executor exited non-zero, or its output was not a JSON object.
    #[error("internal error (executor failed): {reason}")]
    ExecutorFailed { reason: String },

    /// The executor reported an error for the requested operation.
    #[error("{0}")]
    Backend(String),

    /// The reply parsed but lacked the field the operation requires.
    #[error("internal error: wrong result in {operation} (missing `{expected}`)")]
    ProtocolViolation {
        operation: &'static str,
        expected: &'static str,
    },

    #[error("executor timed out after {after:?} running {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },
}

impl BridgeError {
    pub fn failed(reason: impl Into<String>) -> Self {
        BridgeError::ExecutorFailed {
            reason: reason.into(),
        }
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, BridgeError::Backend(_))
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, BridgeError::ProtocolViolation { .. })
    }
}
