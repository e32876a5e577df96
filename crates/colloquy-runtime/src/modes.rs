//! Mode runners.
//!
//! One state-free strategy per execution mode. Every runner produces a
//! *candidate* response — publication authority belongs solely to the
//! orchestrator, after the output-side moderation check succeeds. Agent
//! mode is not a runner here; the orchestrator delegates it to the
//! [`AgentLoopEngine`](colloquy_agent::AgentLoopEngine).

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use colloquy_core::{CheckStatus, CheckType, SourceRef};
use colloquy_events::{ChatEvent, EventPublisher};
use colloquy_guard::SecurityCheckGate;
use colloquy_llm::{LlmProvider, LlmToolDefinition, Message};
use colloquy_tools::{RetrievalClient, Snippet, ToolExecutionEngine};

use crate::error::RuntimeResult;
use crate::session::Session;

/// A candidate assistant response, not yet past the output gate.
#[derive(Debug, Clone)]
pub struct CandidateResponse {
    /// Response text.
    pub content: String,
}

impl CandidateResponse {
    /// Create a candidate from text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Everything a runner needs for one turn.
pub struct TurnContext<'a> {
    /// The session, locked for the duration of the turn.
    pub session: &'a mut Session,
    /// Tool schemas the user is authorized to use this turn.
    pub tool_definitions: &'a [LlmToolDefinition],
    /// System prompt for completion calls.
    pub system_prompt: &'a str,
    /// Event sink (runners never emit `chat_response` through it).
    pub publisher: &'a dyn EventPublisher,
}

/// One strategy for producing a candidate response.
#[async_trait]
pub trait ModeRunner: Send + Sync {
    /// Produce a candidate response for the turn.
    async fn run(&self, ctx: &mut TurnContext<'_>) -> RuntimeResult<CandidateResponse>;
}

/// Plain mode: one completion call, no tools.
pub struct PlainMode {
    llm: Arc<dyn LlmProvider>,
}

impl PlainMode {
    /// Create the runner.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ModeRunner for PlainMode {
    async fn run(&self, ctx: &mut TurnContext<'_>) -> RuntimeResult<CandidateResponse> {
        let response = self
            .llm
            .complete(&ctx.session.messages, &[], ctx.system_prompt)
            .await?;
        Ok(CandidateResponse::new(
            response.message.text().unwrap_or(""),
        ))
    }
}

/// Tools mode: completion with schemas attached, execute emitted calls,
/// then one synthesis completion for the final answer.
pub struct ToolsMode {
    llm: Arc<dyn LlmProvider>,
    engine: Arc<ToolExecutionEngine>,
}

impl ToolsMode {
    /// Create the runner.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, engine: Arc<ToolExecutionEngine>) -> Self {
        Self { llm, engine }
    }
}

#[async_trait]
impl ModeRunner for ToolsMode {
    async fn run(&self, ctx: &mut TurnContext<'_>) -> RuntimeResult<CandidateResponse> {
        let response = self
            .llm
            .complete(
                &ctx.session.messages,
                ctx.tool_definitions,
                ctx.system_prompt,
            )
            .await?;

        let Some(calls) = response.message.tool_calls().map(<[_]>::to_vec) else {
            return Ok(CandidateResponse::new(
                response.message.text().unwrap_or(""),
            ));
        };

        debug!(call_count = calls.len(), "Model emitted tool calls");
        ctx.session
            .add_message(Message::assistant_with_tools(calls.clone()));

        // The model only ever saw authorized schemas, but a hallucinated
        // call to anything else still must not reach the transport.
        let allowed: std::collections::HashSet<&str> = ctx
            .tool_definitions
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        let mut rejected: std::collections::HashMap<String, colloquy_llm::ToolCallResult> =
            std::collections::HashMap::new();
        let mut approved = Vec::with_capacity(calls.len());
        for call in &calls {
            if allowed.contains(call.name.as_str()) {
                approved.push(call.clone());
            } else {
                warn!(tool = %call.name, "Model called an unauthorized tool");
                ctx.publisher.publish(ChatEvent::ToolStart {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                });
                ctx.publisher.publish(ChatEvent::ToolError {
                    tool_call_id: call.id.clone(),
                    error: "tool not authorized".to_string(),
                });
                rejected.insert(
                    call.id.clone(),
                    colloquy_llm::ToolCallResult::error(&call.id, "tool not authorized"),
                );
            }
        }

        let username = ctx.session.user.username.clone();
        let mut executed: std::collections::HashMap<String, colloquy_llm::ToolCallResult> =
            if approved.is_empty() {
                std::collections::HashMap::new()
            } else {
                self.engine
                    .execute(&approved, &username, ctx.publisher)
                    .await
                    .into_iter()
                    .map(|r| (r.call_id.clone(), r))
                    .collect()
            };

        // Merge in emission order.
        let results: Vec<colloquy_llm::ToolCallResult> = calls
            .iter()
            .filter_map(|call| {
                rejected
                    .remove(&call.id)
                    .or_else(|| executed.remove(&call.id))
            })
            .collect();

        ctx.session.metadata.tool_call_count = ctx
            .session
            .metadata
            .tool_call_count
            .saturating_add(results.len());
        for result in results {
            ctx.session.add_message(Message::tool_result(result));
        }

        // Synthesis call: no tools attached, the model must answer now.
        let synthesis = self
            .llm
            .complete(&ctx.session.messages, &[], ctx.system_prompt)
            .await?;
        Ok(CandidateResponse::new(
            synthesis.message.text().unwrap_or(""),
        ))
    }
}

/// RAG mode: retrieval merged into the prompt context, then one
/// completion call. Retrieved content rides the `rag` checkpoint; blocked
/// snippets are dropped before they can reach the model.
pub struct RagMode {
    llm: Arc<dyn LlmProvider>,
    retrieval: Arc<dyn RetrievalClient>,
    gate: Arc<SecurityCheckGate>,
    top_k: usize,
}

impl RagMode {
    /// Create the runner.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        retrieval: Arc<dyn RetrievalClient>,
        gate: Arc<SecurityCheckGate>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            retrieval,
            gate,
            top_k,
        }
    }

    /// Fetch snippets and gate each one.
    async fn gated_snippets(
        &self,
        sources: &[SourceRef],
        query: &str,
        username: &str,
        publisher: &dyn EventPublisher,
    ) -> Vec<Snippet> {
        let snippets = match self.retrieval.query(sources, query, self.top_k).await {
            Ok(snippets) => snippets,
            Err(e) => {
                // Retrieval failure degrades the turn, it does not end it.
                warn!(error = %e, "Retrieval failed, continuing without context");
                return Vec::new();
            },
        };

        let mut kept = Vec::with_capacity(snippets.len());
        for snippet in snippets {
            let verdict = self
                .gate
                .check(&snippet.content, CheckType::Rag, username, vec![])
                .await;
            match verdict.status {
                CheckStatus::Blocked => {
                    publisher.publish(ChatEvent::SecurityWarning {
                        status: CheckStatus::Blocked,
                        message: verdict.message,
                        check_type: CheckType::Rag,
                    });
                },
                CheckStatus::Warning => {
                    publisher.publish(ChatEvent::SecurityWarning {
                        status: CheckStatus::Warning,
                        message: verdict.message,
                        check_type: CheckType::Rag,
                    });
                    kept.push(snippet);
                },
                CheckStatus::Good => kept.push(snippet),
            }
        }
        kept
    }
}

#[async_trait]
impl ModeRunner for RagMode {
    async fn run(&self, ctx: &mut TurnContext<'_>) -> RuntimeResult<CandidateResponse> {
        let query = ctx
            .session
            .messages
            .iter()
            .rev()
            .find(|m| m.role == colloquy_llm::MessageRole::User)
            .and_then(Message::text)
            .unwrap_or("")
            .to_string();
        let sources: Vec<SourceRef> = ctx.session.selected_sources.iter().cloned().collect();
        let username = ctx.session.user.username.clone();

        let kept = self
            .gated_snippets(&sources, &query, &username, ctx.publisher)
            .await;

        // Merge retrieval context ephemerally: it informs this completion
        // without polluting persistent history.
        let mut call_messages = Vec::with_capacity(ctx.session.messages.len().saturating_add(1));
        if !kept.is_empty() {
            let mut context = String::from("Relevant documents:\n");
            for snippet in &kept {
                context.push_str(&format!("[{}] {}\n", snippet.source, snippet.content));
            }
            call_messages.push(Message::system(context));
        }
        call_messages.extend(ctx.session.messages.iter().cloned());

        let response = self
            .llm
            .complete(&call_messages, &[], ctx.system_prompt)
            .await?;
        Ok(CandidateResponse::new(
            response.message.text().unwrap_or(""),
        ))
    }
}
