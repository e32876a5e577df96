//! LLM-related error types.

use thiserror::Error;

/// Errors that can occur with LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Invalid response from API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// A short, non-sensitive category for user-facing error notices.
    ///
    /// Full detail stays in logs; the user sees only the category.
    #[must_use]
    pub fn user_category(&self) -> &'static str {
        match self {
            Self::ApiKeyNotConfigured { .. } | Self::ConfigError(_) => "configuration",
            Self::RateLimitExceeded { .. } => "rate_limited",
            Self::ApiRequestFailed(_) | Self::HttpError(_) => "provider_unavailable",
            Self::InvalidResponse(_) => "provider_error",
        }
    }
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;
