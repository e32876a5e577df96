//! Mock implementations for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use colloquy_events::{ChatEvent, EventPublisher};
use colloquy_guard::{GuardResult, ModerationBackend, ModerationRequest, SecurityCheckResult};
use colloquy_llm::{
    LlmError, LlmProvider, LlmResponse, LlmResult, LlmToolDefinition, Message, MessageContent,
    MessageRole, StopReason, ToolCall, Usage,
};
use colloquy_core::SourceRef;
use colloquy_tools::{RetrievalClient, Snippet, ToolTransport, ToolsError, ToolsResult};

/// One scripted reply from the mock LLM.
#[derive(Debug, Clone)]
enum ScriptedReply {
    /// Plain text response.
    Text(String),
    /// Tool-call response.
    ToolCalls(Vec<ToolCall>),
    /// Provider error.
    Error(String),
}

/// Mock LLM provider with a scripted reply queue.
///
/// Replies pop in order; when the queue is empty the default reply
/// repeats forever (useful for "the model never stops calling tools"
/// scenarios). Uses `std::sync::Mutex` so builder methods work without a
/// tokio runtime.
#[derive(Debug, Clone)]
pub struct MockLlmProvider {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    default_reply: Arc<Mutex<ScriptedReply>>,
    /// Number of `complete` calls observed.
    call_count: Arc<Mutex<usize>>,
}

impl MockLlmProvider {
    /// Create a provider whose default reply is empty text.
    #[must_use]
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: Arc::new(Mutex::new(ScriptedReply::Text(String::new()))),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a text reply.
    #[must_use]
    pub fn push_text(self, text: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(ScriptedReply::Text(text.into()));
        }
        self
    }

    /// Queue a tool-call reply.
    #[must_use]
    pub fn push_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(ScriptedReply::ToolCalls(calls));
        }
        self
    }

    /// Queue a provider error.
    #[must_use]
    pub fn push_error(self, message: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(ScriptedReply::Error(message.into()));
        }
        self
    }

    /// Set the reply repeated when the queue is empty.
    #[must_use]
    pub fn with_default_text(self, text: impl Into<String>) -> Self {
        if let Ok(mut default) = self.default_reply.lock() {
            *default = ScriptedReply::Text(text.into());
        }
        self
    }

    /// Repeat a tool-call reply forever once the queue is empty.
    #[must_use]
    pub fn with_default_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        if let Ok(mut default) = self.default_reply.lock() {
            *default = ScriptedReply::ToolCalls(calls);
        }
        self
    }

    /// Number of completion calls observed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.lock().map(|c| *c).unwrap_or(0)
    }

    fn next_reply(&self) -> ScriptedReply {
        if let Ok(mut count) = self.call_count.lock() {
            *count = count.saturating_add(1);
        }
        let queued = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        queued.unwrap_or_else(|| {
            self.default_reply
                .lock()
                .map(|d| d.clone())
                .unwrap_or(ScriptedReply::Text(String::new()))
        })
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[LlmToolDefinition],
        _system: &str,
    ) -> LlmResult<LlmResponse> {
        match self.next_reply() {
            ScriptedReply::Text(text) => Ok(LlmResponse {
                message: Message {
                    role: MessageRole::Assistant,
                    content: MessageContent::Text(text),
                },
                has_tool_calls: false,
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            }),
            ScriptedReply::ToolCalls(calls) => Ok(LlmResponse {
                message: Message::assistant_with_tools(calls),
                has_tool_calls: true,
                stop_reason: StopReason::ToolUse,
                usage: Usage::default(),
            }),
            ScriptedReply::Error(message) => Err(LlmError::ApiRequestFailed(message)),
        }
    }
}

/// Script for one tool in the mock transport.
#[derive(Debug, Clone)]
pub enum ToolScript {
    /// Return this envelope.
    Envelope(Value),
    /// Return this envelope after a delay.
    SlowEnvelope(Duration, Value),
    /// Fail with a timeout error.
    Timeout,
    /// Fail with a transport error.
    Fail(String),
}

/// Mock tool transport scripted per `server:tool` name.
///
/// Unknown tools fail with a transport error, matching how the real
/// transport reports an unreachable tool.
#[derive(Debug, Clone, Default)]
pub struct MockToolTransport {
    scripts: Arc<Mutex<HashMap<String, ToolScript>>>,
    /// Invocations observed, in arrival order.
    invocations: Arc<Mutex<Vec<String>>>,
}

impl MockToolTransport {
    /// Create a transport with no scripted tools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a tool.
    #[must_use]
    pub fn with_script(self, full_name: impl Into<String>, script: ToolScript) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(full_name.into(), script);
        }
        self
    }

    /// Script a tool to return a plain text result envelope.
    #[must_use]
    pub fn with_text_result(self, full_name: impl Into<String>, text: impl Into<String>) -> Self {
        let envelope = serde_json::json!({"results": text.into()});
        self.with_script(full_name, ToolScript::Envelope(envelope))
    }

    /// Names of tools invoked, in arrival order.
    #[must_use]
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolTransport for MockToolTransport {
    async fn invoke(&self, server: &str, tool: &str, _arguments: Value) -> ToolsResult<Value> {
        let full_name = format!("{server}:{tool}");
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(full_name.clone());
        }

        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|scripts| scripts.get(&full_name).cloned());

        match script {
            Some(ToolScript::Envelope(envelope)) => Ok(envelope),
            Some(ToolScript::SlowEnvelope(delay, envelope)) => {
                tokio::time::sleep(delay).await;
                Ok(envelope)
            },
            Some(ToolScript::Timeout) => Err(ToolsError::Timeout {
                server: server.to_string(),
                tool: tool.to_string(),
                timeout_ms: 1000,
            }),
            Some(ToolScript::Fail(reason)) => Err(ToolsError::TransportFailed {
                server: server.to_string(),
                tool: tool.to_string(),
                reason,
            }),
            None => Err(ToolsError::TransportFailed {
                server: server.to_string(),
                tool: tool.to_string(),
                reason: "tool not scripted".to_string(),
            }),
        }
    }
}

/// Mock moderation backend with keyword-triggered verdicts.
///
/// Content containing a blocked keyword is blocked; a warning keyword
/// warns; everything else is good. `failing()` makes every call error so
/// tests can exercise the fail-open path.
#[derive(Debug, Clone, Default)]
pub struct MockModerationBackend {
    blocked_keywords: Vec<String>,
    warning_keywords: Vec<String>,
    failing: bool,
}

impl MockModerationBackend {
    /// Create a backend that allows everything.
    #[must_use]
    pub fn allowing() -> Self {
        Self::default()
    }

    /// Create a backend that errors on every call.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Block content containing this keyword.
    #[must_use]
    pub fn with_blocked_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.blocked_keywords.push(keyword.into());
        self
    }

    /// Warn on content containing this keyword.
    #[must_use]
    pub fn with_warning_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.warning_keywords.push(keyword.into());
        self
    }
}

#[async_trait]
impl ModerationBackend for MockModerationBackend {
    async fn classify(&self, request: &ModerationRequest) -> GuardResult<SecurityCheckResult> {
        if self.failing {
            return Err(colloquy_guard::GuardError::EndpointStatus { status: 500 });
        }
        if self
            .blocked_keywords
            .iter()
            .any(|k| request.content.contains(k))
        {
            return Ok(SecurityCheckResult::blocked("Content violates policy"));
        }
        if self
            .warning_keywords
            .iter()
            .any(|k| request.content.contains(k))
        {
            return Ok(SecurityCheckResult::warning("Content may violate policy"));
        }
        Ok(SecurityCheckResult::good())
    }
}

/// Mock retrieval client returning a fixed snippet list.
#[derive(Debug, Clone, Default)]
pub struct MockRetrievalClient {
    snippets: Arc<Mutex<Vec<Snippet>>>,
    failing: bool,
}

impl MockRetrievalClient {
    /// Create a client that returns no snippets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client that errors on every query.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Add a snippet to every response.
    #[must_use]
    pub fn with_snippet(self, source: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        if let Ok(mut snippets) = self.snippets.lock() {
            snippets.push(Snippet {
                source: source.into(),
                content: content.into(),
                score,
            });
        }
        self
    }
}

#[async_trait]
impl RetrievalClient for MockRetrievalClient {
    async fn query(
        &self,
        _sources: &[SourceRef],
        _text: &str,
        top_k: usize,
    ) -> ToolsResult<Vec<Snippet>> {
        if self.failing {
            return Err(ToolsError::RetrievalFailed("scripted failure".to_string()));
        }
        let mut snippets = self.snippets.lock().map(|s| s.clone()).unwrap_or_default();
        snippets.truncate(top_k);
        Ok(snippets)
    }
}

/// Publisher that records events in order for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingPublisher {
    events: Arc<Mutex<Vec<ChatEvent>>>,
}

impl CollectingPublisher {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured events, in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Captured events of one type.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<ChatEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Whether any event of the given type was published.
    #[must_use]
    pub fn has_event(&self, event_type: &str) -> bool {
        !self.events_of_type(event_type).is_empty()
    }

    /// Number of events of the given type.
    #[must_use]
    pub fn count_of(&self, event_type: &str) -> usize {
        self.events_of_type(event_type).len()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventPublisher for CollectingPublisher {
    fn publish(&self, event: ChatEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
