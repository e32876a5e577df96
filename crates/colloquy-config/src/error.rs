//! Configuration error types.

use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A config file could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// File path.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The merged configuration failed validation.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
