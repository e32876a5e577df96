//! Configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] on the first invalid value.
pub(crate) fn validate(config: &Config) -> ConfigResult<()> {
    if config.agent.max_steps == 0 {
        return Err(ConfigError::Validation(
            "agent.max_steps must be at least 1".to_string(),
        ));
    }
    if config.guard.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "guard.timeout_secs must be non-zero".to_string(),
        ));
    }
    if config.tools.call_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "tools.call_timeout_secs must be non-zero".to_string(),
        ));
    }
    if config.tools.max_in_flight == 0 {
        return Err(ConfigError::Validation(
            "tools.max_in_flight must be at least 1".to_string(),
        ));
    }
    if config.retrieval.top_k == 0 {
        return Err(ConfigError::Validation(
            "retrieval.top_k must be at least 1".to_string(),
        ));
    }
    for (name, endpoint) in [
        ("guard.endpoint", &config.guard.endpoint),
        ("tools.endpoint", &config.tools.endpoint),
        ("retrieval.endpoint", &config.retrieval.endpoint),
    ] {
        if !endpoint.is_empty() && !endpoint.starts_with("http") {
            return Err(ConfigError::Validation(format!(
                "{name} must be an http(s) URL"
            )));
        }
    }
    match config.logging.format.as_str() {
        "pretty" | "json" => {},
        other => {
            return Err(ConfigError::Validation(format!(
                "logging.format must be `pretty` or `json`, got `{other}`"
            )));
        },
    }
    Ok(())
}
