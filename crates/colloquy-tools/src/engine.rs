//! The tool execution engine.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use colloquy_core::{CheckStatus, CheckType};
use colloquy_events::{ChatEvent, EventPublisher};
use colloquy_guard::SecurityCheckGate;
use colloquy_llm::{ToolCall, ToolCallResult};

use crate::envelope::normalize_envelope;
use crate::error::ToolsError;
use crate::transport::ToolTransport;

/// Default maximum concurrently in-flight tool calls.
const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrently in-flight tool calls.
    pub max_in_flight: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Executes model-emitted tool calls against the transport.
///
/// Calls within one batch run concurrently up to the configured in-flight
/// bound. Results are re-associated by `tool_call_id` and merged in the
/// order the model emitted the calls, not completion order, so conversation
/// history stays reproducible. Every success payload passes the moderation
/// gate (`tool` checkpoint) before it may reach the model; a blocked payload
/// becomes a tool error and never does.
pub struct ToolExecutionEngine {
    transport: Arc<dyn ToolTransport>,
    gate: Arc<SecurityCheckGate>,
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl ToolExecutionEngine {
    /// Create an engine over a transport and moderation gate.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ToolTransport>,
        gate: Arc<SecurityCheckGate>,
        config: EngineConfig,
    ) -> Self {
        let permits = config.max_in_flight.max(1);
        Self {
            transport,
            gate,
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Execute a batch of tool calls.
    ///
    /// Publishes `tool_start` for every call before any dispatch, then
    /// `tool_complete`/`tool_error` per call in emission order once the
    /// whole batch has resolved. Returns results in emission order.
    pub async fn execute(
        &self,
        calls: &[ToolCall],
        username: &str,
        publisher: &dyn EventPublisher,
    ) -> Vec<ToolCallResult> {
        for call in calls {
            publisher.publish(ChatEvent::ToolStart {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
            });
        }

        let outcomes = join_all(calls.iter().map(|call| self.run_one(call, username))).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (result, verdict) in outcomes {
            if let Some((status, message)) = verdict {
                publisher.publish(ChatEvent::SecurityWarning {
                    status,
                    message,
                    check_type: CheckType::Tool,
                });
            }
            if result.is_error {
                publisher.publish(ChatEvent::ToolError {
                    tool_call_id: result.call_id.clone(),
                    error: result.content.clone(),
                });
            } else {
                publisher.publish(ChatEvent::ToolComplete {
                    tool_call_id: result.call_id.clone(),
                    success: true,
                });
            }
            results.push(result);
        }
        results
    }

    /// Dispatch one call and gate its payload.
    ///
    /// Returns the result plus an optional non-good moderation verdict to
    /// surface as a `security_warning` event.
    async fn run_one(
        &self,
        call: &ToolCall,
        username: &str,
    ) -> (ToolCallResult, Option<(CheckStatus, String)>) {
        // The semaphore is never closed; holding the Result keeps the
        // permit alive for the duration of the call.
        let _permit = self.semaphore.acquire().await;

        let Some((server, tool)) = call.parse_name() else {
            let e = ToolsError::MalformedToolName {
                name: call.name.clone(),
            };
            return (ToolCallResult::error(&call.id, e.to_string()), None);
        };

        debug!(server = server, tool = tool, call_id = %call.id, "Executing tool call");

        let raw = match self
            .transport
            .invoke(server, tool, call.arguments.clone())
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(server = server, tool = tool, error = %e, "Tool dispatch failed");
                return (ToolCallResult::error(&call.id, e.to_string()), None);
            },
        };

        let outcome = normalize_envelope(raw);
        if !outcome.is_success() {
            return (
                ToolCallResult::error(&call.id, outcome.render_for_model()),
                None,
            );
        }

        let rendered = outcome.render_for_model();
        let verdict = self
            .gate
            .check(&rendered, CheckType::Tool, username, vec![])
            .await;

        match verdict.status {
            CheckStatus::Blocked => (
                ToolCallResult::error(&call.id, "blocked by policy"),
                Some((CheckStatus::Blocked, verdict.message)),
            ),
            CheckStatus::Warning => (
                ToolCallResult::success(&call.id, rendered),
                Some((CheckStatus::Warning, verdict.message)),
            ),
            CheckStatus::Good => (ToolCallResult::success(&call.id, rendered), None),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for ToolExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_guard::{GuardConfig, GuardResult, ModerationBackend, ModerationRequest, SecurityCheckResult};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Publisher that records events in order.
    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<ChatEvent>>,
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: ChatEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingPublisher {
        fn events(&self) -> Vec<ChatEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    /// Transport scripted per tool name.
    struct ScriptedTransport {
        scripts: HashMap<String, Result<Value, String>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ToolTransport for ScriptedTransport {
        async fn invoke(&self, server: &str, tool: &str, _arguments: Value) -> crate::ToolsResult<Value> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.scripts.get(&format!("{server}:{tool}")) {
                Some(Ok(envelope)) => Ok(envelope.clone()),
                Some(Err(_)) => Err(ToolsError::Timeout {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    timeout_ms: 1,
                }),
                None => Err(ToolsError::TransportFailed {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    reason: "unknown tool".to_string(),
                }),
            }
        }
    }

    /// Backend that blocks content containing a keyword.
    struct KeywordBackend {
        blocked_keyword: String,
    }

    #[async_trait]
    impl ModerationBackend for KeywordBackend {
        async fn classify(&self, request: &ModerationRequest) -> GuardResult<SecurityCheckResult> {
            if request.content.contains(&self.blocked_keyword) {
                Ok(SecurityCheckResult::blocked("Content violates policy"))
            } else {
                Ok(SecurityCheckResult::good())
            }
        }
    }

    fn make_gate(blocked_keyword: &str) -> Arc<SecurityCheckGate> {
        Arc::new(SecurityCheckGate::new(
            Arc::new(KeywordBackend {
                blocked_keyword: blocked_keyword.to_string(),
            }),
            GuardConfig::default(),
        ))
    }

    fn make_engine(scripts: HashMap<String, Result<Value, String>>) -> ToolExecutionEngine {
        ToolExecutionEngine::new(
            Arc::new(ScriptedTransport {
                scripts,
                delay: None,
            }),
            make_gate("FORBIDDEN"),
            EngineConfig::default(),
        )
    }

    fn ok_envelope(text: &str) -> Result<Value, String> {
        Ok(serde_json::json!({"results": text}))
    }

    #[tokio::test]
    async fn test_results_in_emission_order() {
        let mut scripts = HashMap::new();
        scripts.insert("s:alpha".to_string(), ok_envelope("first"));
        scripts.insert("s:beta".to_string(), ok_envelope("second"));
        let engine = make_engine(scripts);
        let publisher = RecordingPublisher::default();

        let calls = vec![
            ToolCall::new("call_1", "s:alpha"),
            ToolCall::new("call_2", "s:beta"),
        ];
        let results = engine.execute(&calls, "alice", &publisher).await;

        assert_eq!(results[0].call_id, "call_1");
        assert_eq!(results[0].content, "first");
        assert_eq!(results[1].call_id, "call_2");
        assert_eq!(results[1].content, "second");
    }

    #[tokio::test]
    async fn test_tool_start_precedes_completion_events() {
        let mut scripts = HashMap::new();
        scripts.insert("s:alpha".to_string(), ok_envelope("out"));
        let engine = make_engine(scripts);
        let publisher = RecordingPublisher::default();

        let calls = vec![ToolCall::new("call_1", "s:alpha")];
        engine.execute(&calls, "alice", &publisher).await;

        let events = publisher.events();
        assert_eq!(events[0].event_type(), "tool_start");
        assert_eq!(events[1].event_type(), "tool_complete");
    }

    #[tokio::test]
    async fn test_mixed_success_and_timeout() {
        let mut scripts = HashMap::new();
        scripts.insert("s:a".to_string(), ok_envelope("ok-a"));
        scripts.insert("s:b".to_string(), Err("timeout".to_string()));
        scripts.insert("s:c".to_string(), ok_envelope("ok-c"));
        let engine = make_engine(scripts);
        let publisher = RecordingPublisher::default();

        let calls = vec![
            ToolCall::new("c1", "s:a"),
            ToolCall::new("c2", "s:b"),
            ToolCall::new("c3", "s:c"),
        ];
        let results = engine.execute(&calls, "alice", &publisher).await;

        assert!(!results[0].is_error);
        assert!(results[1].is_error);
        assert!(!results[2].is_error);

        let events = publisher.events();
        let starts = events.iter().filter(|e| e.event_type() == "tool_start").count();
        let completes = events
            .iter()
            .filter(|e| e.event_type() == "tool_complete")
            .count();
        let errors = events.iter().filter(|e| e.event_type() == "tool_error").count();
        assert_eq!(starts, 3);
        assert_eq!(completes, 2);
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn test_every_call_id_appears_exactly_once() {
        let mut scripts = HashMap::new();
        for i in 0..6 {
            scripts.insert(format!("s:tool{i}"), ok_envelope("out"));
        }
        let engine = make_engine(scripts);
        let publisher = RecordingPublisher::default();

        let calls: Vec<ToolCall> = (0..6)
            .map(|i| ToolCall::new(format!("call_{i}"), format!("s:tool{i}")))
            .collect();
        engine.execute(&calls, "alice", &publisher).await;

        let events = publisher.events();
        for call in &calls {
            let terminal = events
                .iter()
                .filter(|e| {
                    matches!(e.event_type(), "tool_complete" | "tool_error")
                        && e.tool_call_id() == Some(call.id.as_str())
                })
                .count();
            assert_eq!(terminal, 1, "call {} should terminate exactly once", call.id);
        }
    }

    #[tokio::test]
    async fn test_blocked_payload_becomes_policy_error() {
        let mut scripts = HashMap::new();
        scripts.insert("s:leak".to_string(), ok_envelope("FORBIDDEN data"));
        let engine = make_engine(scripts);
        let publisher = RecordingPublisher::default();

        let calls = vec![ToolCall::new("c1", "s:leak")];
        let results = engine.execute(&calls, "alice", &publisher).await;

        assert!(results[0].is_error);
        assert_eq!(results[0].content, "blocked by policy");
        // The blocked payload never appears in the result
        assert!(!results[0].content.contains("FORBIDDEN"));

        let events = publisher.events();
        assert!(events.iter().any(|e| e.event_type() == "security_warning"));
    }

    #[tokio::test]
    async fn test_malformed_name_is_tool_error() {
        let engine = make_engine(HashMap::new());
        let publisher = RecordingPublisher::default();

        let calls = vec![ToolCall::new("c1", "no_server_prefix")];
        let results = engine.execute(&calls, "alice", &publisher).await;

        assert!(results[0].is_error);
        assert!(results[0].content.contains("malformed tool name"));
    }

    #[tokio::test]
    async fn test_concurrency_bound_respected() {
        // With a bound of 2 and 4 slow calls, the batch still completes.
        let mut scripts = HashMap::new();
        for i in 0..4 {
            scripts.insert(format!("s:t{i}"), ok_envelope("out"));
        }
        let engine = ToolExecutionEngine::new(
            Arc::new(ScriptedTransport {
                scripts,
                delay: Some(Duration::from_millis(10)),
            }),
            make_gate("FORBIDDEN"),
            EngineConfig { max_in_flight: 2 },
        );
        let publisher = RecordingPublisher::default();

        let calls: Vec<ToolCall> = (0..4)
            .map(|i| ToolCall::new(format!("c{i}"), format!("s:t{i}")))
            .collect();
        let results = engine.execute(&calls, "alice", &publisher).await;
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.is_error));
    }
}
