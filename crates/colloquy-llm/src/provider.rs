//! LLM provider trait.

use async_trait::async_trait;

use crate::error::LlmResult;
use crate::types::{LlmResponse, LlmToolDefinition, Message};

/// Completion provider interface.
///
/// Implementors produce one complete response per call. Tool schemas are
/// optional; a provider that receives none must never fabricate tool calls.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Produce a completion for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`](crate::LlmError) if the provider cannot
    /// produce a response.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<LlmResponse>;

    /// Simple text completion (no tools).
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`](crate::LlmError) if the provider cannot
    /// produce a response.
    async fn complete_simple(&self, prompt: &str) -> LlmResult<String> {
        let messages = vec![Message::user(prompt)];
        let response = self.complete(&messages, &[], "").await?;
        Ok(response.message.text().unwrap_or("").to_string())
    }

    /// Count tokens in text (approximate).
    fn count_tokens(&self, text: &str) -> usize {
        // Rough approximation: ~4 chars per token
        text.len() / 4
    }
}

/// Blanket implementation allowing `Box<dyn LlmProvider>` wherever a
/// `P: LlmProvider` type parameter is required.
#[async_trait]
impl LlmProvider for Box<dyn LlmProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<LlmResponse> {
        (**self).complete(messages, tools, system).await
    }

    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }
}

/// Configuration for LLM providers.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Temperature (0.0 - 1.0).
    pub temperature: f64,
    /// API base URL (for custom endpoints).
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("has_base_url", &self.base_url.is_some())
            .finish()
    }
}

impl ProviderConfig {
    /// Create a new config with API key and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.7,
            base_url: None,
        }
    }

    /// Set max tokens.
    #[must_use]
    pub fn max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = temp.clamp(0.0, 1.0);
        self
    }

    /// Set base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ProviderConfig::new("key", "model-x")
            .max_tokens(1024)
            .temperature(1.5);
        assert_eq!(config.max_tokens, 1024);
        assert!((config.temperature - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = ProviderConfig::new("secret-key", "model-x");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("has_api_key"));
    }
}
