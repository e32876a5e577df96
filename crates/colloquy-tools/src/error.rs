//! Tool transport and engine error types.

use thiserror::Error;

/// Errors from tool dispatch.
///
/// None of these are fatal to a turn: the engine converts every variant
/// into a tool-level error result the model can react to.
#[derive(Debug, Error)]
pub enum ToolsError {
    /// The tool name could not be split into `server:tool`.
    #[error("malformed tool name: {name}")]
    MalformedToolName {
        /// The name as emitted by the model.
        name: String,
    },

    /// The transport call failed.
    #[error("tool call failed: {server}:{tool} - {reason}")]
    TransportFailed {
        /// Server name.
        server: String,
        /// Tool name.
        tool: String,
        /// Failure description.
        reason: String,
    },

    /// The tool call did not complete within its timeout.
    #[error("tool call timed out: {server}:{tool} after {timeout_ms}ms")]
    Timeout {
        /// Server name.
        server: String,
        /// Tool name.
        tool: String,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The transport returned an envelope that could not be understood.
    #[error("malformed tool envelope: {0}")]
    MalformedEnvelope(String),

    /// The retrieval endpoint failed.
    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type for tool operations.
pub type ToolsResult<T> = Result<T, ToolsError>;
