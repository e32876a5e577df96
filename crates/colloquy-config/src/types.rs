//! Configuration types.
//!
//! Every struct implements [`Default`] with production defaults so that a
//! bare `[section]` header in TOML produces a working configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider selection.
    pub model: ModelSection,
    /// Moderation gate endpoint and checkpoint flags.
    pub guard: GuardSection,
    /// Tool transport and concurrency limits.
    pub tools: ToolsSection,
    /// Agent loop bounds and approval policy.
    pub agent: AgentSection,
    /// Document retrieval settings.
    pub retrieval: RetrievalSection,
    /// Session limits.
    pub sessions: SessionsSection,
    /// Logging level and format.
    pub logging: LoggingSection,
}

/// LLM provider selection and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Provider identifier (currently `"openai-compat"`).
    pub provider: String,
    /// Model name sent to the provider API.
    pub model: String,
    /// API key. Prefer the `COLLOQUY_API_KEY` environment variable over
    /// storing this in a file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override for the provider API.
    #[serde(skip_serializing)]
    pub api_url: Option<String>,
    /// Maximum tokens to request per completion.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: "openai-compat".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            api_url: None,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Moderation gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSection {
    /// Moderation endpoint URL. Empty disables all checks.
    pub endpoint: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Check inbound user messages.
    pub check_input: bool,
    /// Check candidate assistant responses.
    pub check_output: bool,
    /// Check tool result payloads.
    pub check_tool: bool,
    /// Check retrieved document content.
    pub check_rag: bool,
}

impl Default for GuardSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: 10,
            check_input: true,
            check_output: true,
            check_tool: true,
            check_rag: true,
        }
    }
}

/// Tool transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Tool invocation endpoint URL.
    pub endpoint: String,
    /// Per-call timeout in seconds.
    pub call_timeout_secs: u64,
    /// Maximum concurrently in-flight tool calls per turn.
    pub max_in_flight: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            call_timeout_secs: 60,
            max_in_flight: 4,
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Maximum reasoning steps before forced finalization.
    pub max_steps: usize,
    /// Whether each agent tool call needs human confirmation.
    pub require_approval: bool,
    /// How long to wait for an approval decision, in seconds.
    pub approval_timeout_secs: u64,
    /// How long to wait for an `ask_user` answer, in seconds.
    pub ask_user_timeout_secs: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: 15,
            require_approval: false,
            approval_timeout_secs: 300,
            ask_user_timeout_secs: 120,
        }
    }
}

/// Document retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    /// Retrieval endpoint URL.
    pub endpoint: String,
    /// Snippets to request per query.
    pub top_k: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            top_k: 5,
        }
    }
}

/// Session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Maximum messages retained per session.
    pub max_history_messages: usize,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            max_history_messages: 200,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level directive (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Output format (`pretty` or `json`).
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.agent.max_steps, 15);
        assert_eq!(config.guard.timeout_secs, 10);
        assert!(config.guard.check_input);
    }

    #[test]
    fn test_bare_section_headers_are_valid() {
        let config: Config = toml::from_str("[guard]\n[agent]\n").unwrap();
        assert_eq!(config.tools.max_in_flight, 4);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[agent]\nmax_steps = 3\n").unwrap();
        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.agent.approval_timeout_secs, 300);
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.model.api_key = Some("secret".to_string());
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("secret"));
    }
}
