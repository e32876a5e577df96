//! Tool transport.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{ToolsError, ToolsResult};

/// Default per-call transport timeout.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// The remote tool protocol, consumed through a narrow seam.
///
/// Implementations dispatch `(server, tool, arguments)` and return the raw
/// result envelope; [`normalize_envelope`](crate::normalize_envelope) turns
/// it into a typed outcome at the engine boundary. The transport owns
/// identity: it injects the trusted username and must ignore any identity
/// fields the caller smuggled into `arguments`.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Invoke a tool and return the raw envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolsError`] when the call cannot be dispatched or
    /// does not complete; the engine converts it to a tool-level error
    /// result, never a turn failure.
    async fn invoke(&self, server: &str, tool: &str, arguments: Value) -> ToolsResult<Value>;
}

/// HTTP tool transport.
///
/// Posts `{server, tool, arguments, username}` to the invocation endpoint.
/// The `username` field always comes from this transport's configuration —
/// a `username` key inside the model-supplied arguments is stripped before
/// the request is built, so the model cannot impersonate another user.
pub struct HttpToolTransport {
    client: Client,
    endpoint: String,
    username: String,
    timeout: Duration,
}

impl HttpToolTransport {
    /// Create a transport for the given invocation endpoint and trusted user.
    pub fn new(endpoint: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            username: username.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Strip caller-supplied identity fields from the arguments.
    fn sanitize_arguments(mut arguments: Value) -> Value {
        if let Some(obj) = arguments.as_object_mut() {
            obj.remove("username");
            obj.remove("user");
        }
        arguments
    }
}

impl std::fmt::Debug for HttpToolTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpToolTransport")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn invoke(&self, server: &str, tool: &str, arguments: Value) -> ToolsResult<Value> {
        let arguments = Self::sanitize_arguments(arguments);

        debug!(server = server, tool = tool, "Dispatching tool call");

        let body = serde_json::json!({
            "server": server,
            "tool": tool,
            "arguments": arguments,
            "username": self.username,
        });

        let send = self.client.post(&self.endpoint).json(&body).send();

        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(ToolsError::TransportFailed {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    reason: e.to_string(),
                });
            },
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(ToolsError::Timeout {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    timeout_ms,
                });
            },
        };

        if !response.status().is_success() {
            return Err(ToolsError::TransportFailed {
                server: server.to_string(),
                tool: tool.to_string(),
                reason: format!("HTTP {}", response.status().as_u16()),
            });
        }

        let envelope = match tokio::time::timeout(self.timeout, response.json::<Value>()).await {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => return Err(ToolsError::MalformedEnvelope(e.to_string())),
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(ToolsError::Timeout {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    timeout_ms,
                });
            },
        };

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_identity_fields() {
        let args = serde_json::json!({
            "query": "weather",
            "username": "mallory",
            "user": "mallory"
        });
        let clean = HttpToolTransport::sanitize_arguments(args);
        let obj = clean.as_object().unwrap();
        assert!(obj.contains_key("query"));
        assert!(!obj.contains_key("username"));
        assert!(!obj.contains_key("user"));
    }

    #[test]
    fn test_sanitize_leaves_non_objects_alone() {
        let clean = HttpToolTransport::sanitize_arguments(serde_json::json!([1, 2, 3]));
        assert!(clean.is_array());
    }
}
