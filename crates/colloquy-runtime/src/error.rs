//! Runtime error types.

use thiserror::Error;

/// Errors that can occur in the orchestration runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Session not found.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The session ID.
        session_id: String,
    },

    /// LLM error.
    #[error("LLM error: {0}")]
    LlmError(#[from] colloquy_llm::LlmError),

    /// Tool error.
    #[error("Tool error: {0}")]
    ToolsError(#[from] colloquy_tools::ToolsError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] colloquy_config::ConfigError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RuntimeError {
    /// A coarse, non-sensitive category for user-facing error events.
    #[must_use]
    pub fn user_category(&self) -> &'static str {
        match self {
            Self::SessionNotFound { .. } => "session_not_found",
            Self::LlmError(e) => e.user_category(),
            Self::ToolsError(_) => "tool_failure",
            Self::ConfigError(_) => "configuration",
            Self::SerializationError(_) => "internal",
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
