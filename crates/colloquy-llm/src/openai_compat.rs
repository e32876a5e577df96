//! OpenAI-compatible LLM provider implementation.
//!
//! Works with the `OpenAI` API, vLLM, Ollama, and any other
//! `OpenAI`-compatible chat-completions endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmProvider, ProviderConfig};
use crate::types::{
    LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StopReason, ToolCall,
    Usage,
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    client: Client,
    model: String,
    max_tokens: usize,
    temperature: f64,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Create a provider from a [`ProviderConfig`].
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            api_key: if config.api_key.is_empty() {
                None
            } else {
                Some(config.api_key)
            },
        }
    }

    /// Create a custom provider with an explicit endpoint.
    #[must_use]
    pub fn custom(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            model: model.to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            base_url: base_url.to_string(),
            api_key: api_key.map(ToString::to_string),
        }
    }

    /// Build the request body.
    fn build_request(&self, messages: &[Message], tools: &[LlmToolDefinition], system: &str) -> Value {
        let mut wire_messages = Vec::new();

        if !system.is_empty() {
            wire_messages.push(serde_json::json!({
                "role": "system",
                "content": system
            }));
        }

        for msg in messages {
            wire_messages.push(convert_message(msg));
        }

        let mut request = serde_json::json!({
            "model": self.model,
            "messages": wire_messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false
        });

        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    // Strict endpoints reject a schema without `properties`.
                    let mut parameters = t.input_schema.clone();
                    if let Some(obj) = parameters.as_object_mut() {
                        obj.entry("properties")
                            .or_insert_with(|| serde_json::json!({}));
                    }
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": parameters
                        }
                    })
                })
                .collect();
            request["tools"] = Value::Array(wire_tools);
        }

        request
    }
}

fn convert_message(msg: &Message) -> Value {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
        MessageRole::Tool => "tool",
    };

    match &msg.content {
        MessageContent::Text(text) => {
            serde_json::json!({
                "role": role,
                "content": text
            })
        },
        MessageContent::ToolCalls(tool_calls) => {
            let wire_tool_calls: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": serde_json::to_string(&tc.arguments).unwrap_or_default()
                        }
                    })
                })
                .collect();

            serde_json::json!({
                "role": "assistant",
                "content": Value::Null,
                "tool_calls": wire_tool_calls
            })
        },
        MessageContent::ToolResult(result) => {
            serde_json::json!({
                "role": "tool",
                "tool_call_id": result.call_id,
                "content": result.content
            })
        },
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<LlmResponse> {
        if self.api_key.as_ref().is_none_or(String::is_empty) && !is_local_url(&self.base_url) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "openai-compat".to_string(),
            });
        }

        let request_body = self.build_request(messages, tools, system);

        debug!(
            model = %self.model,
            base_url = %self.base_url,
            "Making OpenAI-compatible completion request"
        );

        let mut request = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            let mut auth_value = reqwest::header::HeaderValue::try_from(format!(
                "Bearer {api_key}"
            ))
            .map_err(|e| LlmError::ApiRequestFailed(format!("Invalid API key characters: {e}")))?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Completion endpoint error");
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimitExceeded { retry_after_secs: 30 });
            }
            let status_code = status.as_u16();
            return Err(LlmError::InvalidResponse(format!(
                "HTTP {status_code}: {body}"
            )));
        }

        let response: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let (content, has_tool_calls) = match &choice.message.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => {
                let mut calls = Vec::new();
                for tc in tool_calls {
                    let arguments: Value =
                        serde_json::from_str(&tc.function.arguments).map_err(|e| {
                            LlmError::InvalidResponse(format!("Invalid tool arguments JSON: {e}"))
                        })?;
                    calls.push(ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments,
                    });
                }
                (MessageContent::ToolCalls(calls), true)
            },
            _ => (
                MessageContent::Text(choice.message.content.clone().unwrap_or_default()),
                false,
            ),
        };

        let message = Message {
            role: MessageRole::Assistant,
            content,
        };

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            Some("tool_calls") => StopReason::ToolUse,
            Some("content_filter") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse {
            message,
            has_tool_calls,
            stop_reason,
            usage: Usage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

fn is_local_url(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1") || url.contains("0.0.0.0")
}

// Wire response types

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_includes_system() {
        let provider = OpenAiCompatProvider::custom("http://localhost:1234/v1", None, "local");
        let body = provider.build_request(&[Message::user("hi")], &[], "be terse");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
    }

    #[test]
    fn test_build_request_tool_schema_gets_properties() {
        let provider = OpenAiCompatProvider::custom("http://localhost:1234/v1", None, "local");
        let tools = vec![LlmToolDefinition::new("search:web_lookup")];
        let body = provider.build_request(&[], &tools, "");
        let parameters = &body["tools"][0]["function"]["parameters"];
        assert!(parameters["properties"].is_object());
    }

    #[test]
    fn test_convert_tool_result_message() {
        let msg = Message::tool_result(crate::types::ToolCallResult::success("call_7", "out"));
        let wire = convert_message(&msg);
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_7");
    }

    #[tokio::test]
    async fn test_remote_requires_api_key() {
        let provider = OpenAiCompatProvider::custom("https://api.example.com/v1", None, "m");
        let err = provider.complete(&[], &[], "").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
    }
}
