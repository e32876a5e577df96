//! Moderation gate error types.

use thiserror::Error;

/// Errors from the moderation backend.
///
/// These never escape the gate: every variant resolves to a fail-open
/// `good` verdict at the [`SecurityCheckGate`](crate::SecurityCheckGate)
/// boundary.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The moderation endpoint returned a non-success status.
    #[error("moderation endpoint returned HTTP {status}")]
    EndpointStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The moderation call did not complete within the configured timeout.
    #[error("moderation call timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The endpoint response could not be parsed.
    #[error("invalid moderation response: {0}")]
    InvalidResponse(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type for moderation backend operations.
pub type GuardResult<T> = Result<T, GuardError>;
