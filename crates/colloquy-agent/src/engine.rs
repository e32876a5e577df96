//! The agent loop engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use colloquy_approval::{ApprovalManager, ApprovalOutcome};
use colloquy_core::{AgentPhase, CheckStatus, CheckType, ToolRef};
use colloquy_events::{ChatEvent, EventPublisher};
use colloquy_guard::SecurityCheckGate;
use colloquy_llm::{LlmProvider, LlmToolDefinition, Message, ToolCall, ToolCallResult};
use colloquy_tools::ToolExecutionEngine;

use crate::input::UserInputSource;
use crate::state::{AgentAction, AgentOutcome, AgentStep};

/// Reserved pseudo-tool the model calls to ask the user a question.
///
/// Deliberately unqualified (no `server:` prefix) so it can never collide
/// with a transport tool.
pub const ASK_USER_TOOL: &str = "ask_user";

/// Default maximum reasoning steps.
const DEFAULT_MAX_STEPS: usize = 15;
/// Default wait for an `ask_user` answer.
const DEFAULT_ASK_USER_TIMEOUT: Duration = Duration::from_secs(120);

/// Agent loop configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum reasoning steps before the loop is forced to finalize.
    pub max_steps: usize,
    /// Whether each tool call needs human confirmation.
    pub require_approval: bool,
    /// How long to wait for an `ask_user` answer.
    pub ask_user_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            require_approval: false,
            ask_user_timeout: DEFAULT_ASK_USER_TIMEOUT,
        }
    }
}

/// Drives one agent turn through the state machine.
///
/// The loop owns no session state: it works on the message list it is
/// given and returns a terminal [`AgentOutcome`]. The final answer has not
/// passed the output checkpoint when it comes back — that gate, and the
/// `chat_response` publish, belong to the orchestrator.
pub struct AgentLoopEngine {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolExecutionEngine>,
    gate: Arc<SecurityCheckGate>,
    approval: Arc<ApprovalManager>,
    input: Arc<dyn UserInputSource>,
    config: AgentConfig,
}

impl AgentLoopEngine {
    /// Create an engine over the shared collaborators.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolExecutionEngine>,
        gate: Arc<SecurityCheckGate>,
        approval: Arc<ApprovalManager>,
        input: Arc<dyn UserInputSource>,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            gate,
            approval,
            input,
            config,
        }
    }

    /// Loop configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one agent turn.
    ///
    /// `messages` already contains the user's message; tool calls and
    /// results are appended as the loop progresses so partial progress is
    /// retained even when the loop fails. Cancellation is cooperative:
    /// the token is checked at state transitions and before each dispatch,
    /// never mid-call.
    #[allow(clippy::too_many_lines)]
    pub async fn run(
        &self,
        messages: &mut Vec<Message>,
        system_prompt: &str,
        tools: &[LlmToolDefinition],
        username: &str,
        publisher: &dyn EventPublisher,
        cancel: &CancellationToken,
    ) -> AgentOutcome {
        let mut llm_tools: Vec<LlmToolDefinition> = tools.to_vec();
        llm_tools.push(ask_user_definition());
        let allowed: std::collections::HashSet<String> =
            llm_tools.iter().map(|d| d.name.clone()).collect();

        let mut trace: Vec<AgentStep> = Vec::new();
        let mut step: usize = 0;

        let outcome = loop {
            if cancel.is_cancelled() {
                publisher.publish(ChatEvent::AgentUpdate {
                    step,
                    state: AgentPhase::Cancelled,
                });
                break AgentOutcome::Cancelled { steps: step };
            }

            if step >= self.config.max_steps {
                break self
                    .finalize_at_bound(messages, system_prompt, step, publisher)
                    .await;
            }

            publisher.publish(ChatEvent::AgentUpdate {
                step,
                state: AgentPhase::Planning,
            });
            trace.push(AgentStep::new(step, AgentAction::Think));

            let response = match self.llm.complete(messages, &llm_tools, system_prompt).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(step, error = %e, "Planning call failed");
                    publisher.publish(ChatEvent::AgentUpdate {
                        step,
                        state: AgentPhase::Failed,
                    });
                    break AgentOutcome::Failed {
                        reason: format!("language model error: {}", e.user_category()),
                        steps: step,
                    };
                },
            };

            let calls: Vec<ToolCall> = response
                .message
                .tool_calls()
                .map(<[ToolCall]>::to_vec)
                .unwrap_or_default();

            if calls.is_empty() {
                let answer = response.message.text().unwrap_or("").to_string();
                if answer.is_empty() {
                    publisher.publish(ChatEvent::AgentUpdate {
                        step,
                        state: AgentPhase::Failed,
                    });
                    break AgentOutcome::Failed {
                        reason: "model returned an empty response".to_string(),
                        steps: step.saturating_add(1),
                    };
                }
                trace.push(AgentStep::new(step, AgentAction::Done));
                publisher.publish(ChatEvent::AgentUpdate {
                    step,
                    state: AgentPhase::Done,
                });
                break AgentOutcome::Done {
                    answer,
                    steps: step.saturating_add(1),
                };
            }

            // A lone ask_user call suspends the loop for user input.
            if calls.len() == 1 && calls[0].name == ASK_USER_TOOL {
                self.ask_user(messages, &calls[0], step, username, publisher)
                    .await;
                trace.push(AgentStep::new(step, AgentAction::AskUser));
                step = step.saturating_add(1);
                continue;
            }

            if cancel.is_cancelled() {
                publisher.publish(ChatEvent::AgentUpdate {
                    step,
                    state: AgentPhase::Cancelled,
                });
                break AgentOutcome::Cancelled { steps: step };
            }

            publisher.publish(ChatEvent::AgentUpdate {
                step,
                state: AgentPhase::Acting,
            });
            trace.push(
                AgentStep::new(step, AgentAction::Act)
                    .with_tool_calls(calls.iter().map(|c| c.id.clone()).collect()),
            );

            let results = self
                .dispatch_calls(&calls, &allowed, step, username, publisher)
                .await;

            messages.push(Message::assistant_with_tools(calls));
            let result_count = results.len();
            for result in results {
                messages.push(Message::tool_result(result));
            }

            publisher.publish(ChatEvent::AgentUpdate {
                step,
                state: AgentPhase::Observing,
            });
            trace.push(
                AgentStep::new(step, AgentAction::Observe)
                    .with_observation(format!("{result_count} tool results")),
            );

            step = step.saturating_add(1);
        };

        debug!(
            steps = trace.len(),
            outcome_steps = outcome.steps(),
            "Agent turn finished, step trace discarded"
        );
        outcome
    }

    /// Dispatch one batch of tool calls, applying the approval gate.
    ///
    /// Returns results in emission order. Denied calls never reach the
    /// transport; their `tool_start`/`tool_error` events are still emitted
    /// so every call ID terminates exactly once.
    async fn dispatch_calls(
        &self,
        calls: &[ToolCall],
        allowed: &std::collections::HashSet<String>,
        step: usize,
        username: &str,
        publisher: &dyn EventPublisher,
    ) -> Vec<ToolCallResult> {
        let mut rejected: HashMap<String, ToolCallResult> = HashMap::new();
        let mut approved: Vec<ToolCall> = Vec::new();

        for call in calls {
            // ask_user mixed into a multi-call batch is refused; the model
            // must ask in its own step.
            if call.name == ASK_USER_TOOL {
                rejected.insert(
                    call.id.clone(),
                    ToolCallResult::error(
                        &call.id,
                        "ask_user must be the only call in a step",
                    ),
                );
                continue;
            }

            // A hallucinated call to an unauthorized tool never reaches
            // the transport.
            if !allowed.contains(&call.name) {
                warn!(tool = %call.name, "Model called an unauthorized tool");
                rejected.insert(
                    call.id.clone(),
                    ToolCallResult::error(&call.id, "tool not authorized"),
                );
                continue;
            }

            if self.config.require_approval
                && let Some((server, tool)) = call.parse_name()
            {
                let tool_ref = ToolRef::new(server, tool);
                publisher.publish(ChatEvent::ApprovalRequested {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                });
                let outcome = self
                    .approval
                    .check_approval(&tool_ref, &call.id, format!("agent step {step}"))
                    .await;
                if let ApprovalOutcome::Denied { reason } = outcome {
                    rejected.insert(
                        call.id.clone(),
                        ToolCallResult::error(&call.id, format!("approval denied: {reason}")),
                    );
                    continue;
                }
            }

            approved.push(call.clone());
        }

        // Rejected calls still get their start/terminal event pair.
        for call in calls {
            if let Some(result) = rejected.get(&call.id) {
                publisher.publish(ChatEvent::ToolStart {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                });
                publisher.publish(ChatEvent::ToolError {
                    tool_call_id: call.id.clone(),
                    error: result.content.clone(),
                });
            }
        }

        let mut executed: HashMap<String, ToolCallResult> = if approved.is_empty() {
            HashMap::new()
        } else {
            self.tools
                .execute(&approved, username, publisher)
                .await
                .into_iter()
                .map(|r| (r.call_id.clone(), r))
                .collect()
        };

        // Merge in emission order.
        calls
            .iter()
            .filter_map(|call| {
                rejected
                    .remove(&call.id)
                    .or_else(|| executed.remove(&call.id))
            })
            .collect()
    }

    /// Suspend for user input on a lone `ask_user` call.
    ///
    /// The question is model output and passes the output checkpoint
    /// before it is shown; a blocked question is folded back as a tool
    /// error and the loop keeps planning. No answer within the timeout
    /// cancels the question only, not the turn.
    async fn ask_user(
        &self,
        messages: &mut Vec<Message>,
        call: &ToolCall,
        step: usize,
        username: &str,
        publisher: &dyn EventPublisher,
    ) {
        let question = call.arguments["question"]
            .as_str()
            .unwrap_or("(no question provided)")
            .to_string();

        let verdict = self
            .gate
            .check(&question, CheckType::Output, username, vec![])
            .await;

        if verdict.is_blocked() {
            publisher.publish(ChatEvent::SecurityWarning {
                status: CheckStatus::Blocked,
                message: verdict.message,
                check_type: CheckType::Output,
            });
            messages.push(Message::assistant_with_tools(vec![call.clone()]));
            messages.push(Message::tool_result(ToolCallResult::error(
                &call.id,
                "question blocked by policy",
            )));
            return;
        }

        if verdict.status == CheckStatus::Warning {
            publisher.publish(ChatEvent::SecurityWarning {
                status: CheckStatus::Warning,
                message: verdict.message,
                check_type: CheckType::Output,
            });
        }

        publisher.publish(ChatEvent::AgentUpdate {
            step,
            state: AgentPhase::AskUser,
        });
        publisher.publish(ChatEvent::AgentQuestion {
            content: question.clone(),
        });

        let answer = tokio::time::timeout(
            self.config.ask_user_timeout,
            self.input.request_input(&question),
        )
        .await;

        let content = match answer {
            Ok(Some(answer)) => answer,
            Ok(None) | Err(_) => {
                debug!(step, "No answer to agent question, continuing without one");
                "the user did not answer".to_string()
            },
        };

        messages.push(Message::assistant_with_tools(vec![call.clone()]));
        messages.push(Message::tool_result(ToolCallResult::success(
            &call.id, content,
        )));
    }

    /// Force termination at the step bound with one final no-tools call.
    async fn finalize_at_bound(
        &self,
        messages: &[Message],
        system_prompt: &str,
        step: usize,
        publisher: &dyn EventPublisher,
    ) -> AgentOutcome {
        debug!(step, "Step bound reached, forcing finalization");

        let response = self.llm.complete(messages, &[], system_prompt).await;
        let answer = response
            .ok()
            .and_then(|r| r.message.text().map(ToString::to_string))
            .filter(|text| !text.is_empty());

        if let Some(answer) = answer {
            publisher.publish(ChatEvent::AgentUpdate {
                step,
                state: AgentPhase::Done,
            });
            AgentOutcome::Done {
                answer,
                steps: step,
            }
        } else {
            publisher.publish(ChatEvent::AgentUpdate {
                step,
                state: AgentPhase::Failed,
            });
            AgentOutcome::Failed {
                reason: "step limit reached without a final answer".to_string(),
                steps: step,
            }
        }
    }
}

impl std::fmt::Debug for AgentLoopEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoopEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Definition of the reserved `ask_user` pseudo-tool.
fn ask_user_definition() -> LlmToolDefinition {
    LlmToolDefinition::new(ASK_USER_TOOL)
        .with_description("Ask the user a clarifying question and wait for the answer")
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "question": {"type": "string"}
            },
            "required": ["question"]
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_approval::{
        ApprovalDecision, ApprovalHandler, ApprovalRequest, ApprovalResponse, GrantStore,
    };
    use colloquy_guard::GuardConfig;
    use colloquy_test::{CollectingPublisher, MockLlmProvider, MockModerationBackend, MockToolTransport};
    use colloquy_tools::EngineConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Input source with a queue of canned answers.
    struct QueuedInput {
        answers: Mutex<VecDeque<String>>,
    }

    impl QueuedInput {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(ToString::to_string).collect()),
            }
        }
    }

    #[async_trait::async_trait]
    impl UserInputSource for QueuedInput {
        async fn request_input(&self, _question: &str) -> Option<String> {
            self.answers.lock().ok().and_then(|mut a| a.pop_front())
        }
    }

    /// Handler that denies every approval request.
    struct DenyAllHandler;

    #[async_trait::async_trait]
    impl ApprovalHandler for DenyAllHandler {
        async fn request_approval(&self, request: ApprovalRequest) -> Option<ApprovalResponse> {
            Some(ApprovalResponse::new(
                request.id,
                ApprovalDecision::Deny {
                    reason: "not on my watch".to_string(),
                },
            ))
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn make_engine(
        llm: MockLlmProvider,
        transport: MockToolTransport,
        config: AgentConfig,
    ) -> AgentLoopEngine {
        let backend = Arc::new(MockModerationBackend::allowing());
        let gate = Arc::new(SecurityCheckGate::new(backend, GuardConfig::default()));
        let tools = Arc::new(ToolExecutionEngine::new(
            Arc::new(transport),
            Arc::clone(&gate),
            EngineConfig::default(),
        ));
        AgentLoopEngine::new(
            Arc::new(llm),
            tools,
            gate,
            Arc::new(ApprovalManager::new(Arc::new(GrantStore::new()))),
            Arc::new(QueuedInput::new(&[])),
            config,
        )
    }

    fn lookup_call(id: &str) -> ToolCall {
        ToolCall::new(id, "search:web_lookup")
            .with_arguments(serde_json::json!({"query": "anything"}))
    }

    fn lookup_def() -> LlmToolDefinition {
        LlmToolDefinition::new("search:web_lookup")
    }

    #[tokio::test]
    async fn test_done_on_text_response() {
        let llm = MockLlmProvider::new().push_text("the answer");
        let engine = make_engine(llm, MockToolTransport::new(), AgentConfig::default());
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("question")];
        let outcome = engine
            .run(&mut messages, "", &[], "alice", &publisher, &cancel)
            .await;

        assert_eq!(
            outcome,
            AgentOutcome::Done {
                answer: "the answer".to_string(),
                steps: 1
            }
        );
        // The candidate answer is returned, not appended: the orchestrator
        // appends it only after the output gate passes.
        assert_eq!(messages.len(), 1);
        assert!(publisher.has_event("agent_update"));
        // The loop never publishes the response itself
        assert!(!publisher.has_event("chat_response"));
    }

    #[tokio::test]
    async fn test_act_observe_then_done() {
        let llm = MockLlmProvider::new()
            .push_tool_calls(vec![lookup_call("c1")])
            .push_text("final answer");
        let transport = MockToolTransport::new().with_text_result("search:web_lookup", "found it");
        let engine = make_engine(llm, transport, AgentConfig::default());
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("look this up")];
        let outcome = engine
            .run(&mut messages, "", &[lookup_def()], "alice", &publisher, &cancel)
            .await;

        let AgentOutcome::Done { answer, steps } = outcome else {
            panic!("expected done");
        };
        assert_eq!(answer, "final answer");
        assert_eq!(steps, 2);

        assert_eq!(publisher.count_of("tool_start"), 1);
        assert_eq!(publisher.count_of("tool_complete"), 1);
        // The tool result was folded into context
        assert!(
            messages
                .iter()
                .any(|m| matches!(&m.content, colloquy_llm::MessageContent::ToolResult(r) if r.content == "found it"))
        );
    }

    #[tokio::test]
    async fn test_step_bound_forces_termination() {
        // The model requests another tool call forever.
        let llm = MockLlmProvider::new().with_default_tool_calls(vec![lookup_call("c")]);
        let transport = MockToolTransport::new().with_text_result("search:web_lookup", "more data");
        let engine = make_engine(
            llm,
            transport,
            AgentConfig {
                max_steps: 3,
                ..AgentConfig::default()
            },
        );
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("never stops")];
        let outcome = engine
            .run(&mut messages, "", &[lookup_def()], "alice", &publisher, &cancel)
            .await;

        // Terminal at step 3, never step 4
        assert!(matches!(
            outcome,
            AgentOutcome::Failed { steps: 3, .. } | AgentOutcome::Done { steps: 3, .. }
        ));
        let planning_count = publisher
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    ChatEvent::AgentUpdate {
                        state: AgentPhase::Planning,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(planning_count, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let llm = MockLlmProvider::new().push_text("never reached");
        let engine = make_engine(llm, MockToolTransport::new(), AgentConfig::default());
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut messages = vec![Message::user("stop me")];
        let outcome = engine
            .run(&mut messages, "", &[], "alice", &publisher, &cancel)
            .await;

        assert_eq!(outcome, AgentOutcome::Cancelled { steps: 0 });
    }

    #[tokio::test]
    async fn test_llm_error_fails_without_losing_history() {
        let llm = MockLlmProvider::new()
            .push_tool_calls(vec![lookup_call("c1")])
            .push_error("provider down");
        let transport = MockToolTransport::new().with_text_result("search:web_lookup", "partial");
        let engine = make_engine(llm, transport, AgentConfig::default());
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("go")];
        let outcome = engine
            .run(&mut messages, "", &[lookup_def()], "alice", &publisher, &cancel)
            .await;

        assert!(matches!(outcome, AgentOutcome::Failed { .. }));
        // The successful observation from step 0 is retained
        assert!(
            messages
                .iter()
                .any(|m| matches!(&m.content, colloquy_llm::MessageContent::ToolResult(r) if r.content == "partial"))
        );
    }

    #[tokio::test]
    async fn test_ask_user_merges_answer() {
        let ask = ToolCall::new("q1", ASK_USER_TOOL)
            .with_arguments(serde_json::json!({"question": "Which city?"}));
        let llm = MockLlmProvider::new()
            .push_tool_calls(vec![ask])
            .push_text("Paris it is");
        let backend = Arc::new(MockModerationBackend::allowing());
        let gate = Arc::new(SecurityCheckGate::new(backend, GuardConfig::default()));
        let tools = Arc::new(ToolExecutionEngine::new(
            Arc::new(MockToolTransport::new()),
            Arc::clone(&gate),
            EngineConfig::default(),
        ));
        let engine = AgentLoopEngine::new(
            Arc::new(llm),
            tools,
            gate,
            Arc::new(ApprovalManager::new(Arc::new(GrantStore::new()))),
            Arc::new(QueuedInput::new(&["Paris"])),
            AgentConfig::default(),
        );
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("book a trip")];
        let outcome = engine
            .run(&mut messages, "", &[], "alice", &publisher, &cancel)
            .await;

        assert!(matches!(outcome, AgentOutcome::Done { .. }));
        assert!(publisher.has_event("agent_question"));
        assert!(
            messages
                .iter()
                .any(|m| matches!(&m.content, colloquy_llm::MessageContent::ToolResult(r) if r.content == "Paris"))
        );
    }

    #[tokio::test]
    async fn test_ask_user_without_answer_continues() {
        let ask = ToolCall::new("q1", ASK_USER_TOOL)
            .with_arguments(serde_json::json!({"question": "Which city?"}));
        let llm = MockLlmProvider::new()
            .push_tool_calls(vec![ask])
            .push_text("guessing Paris");
        // Empty input queue: the user never answers
        let engine = make_engine(llm, MockToolTransport::new(), AgentConfig::default());
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("book a trip")];
        let outcome = engine
            .run(&mut messages, "", &[], "alice", &publisher, &cancel)
            .await;

        // The unanswered question cancels the question only, not the turn
        assert!(matches!(outcome, AgentOutcome::Done { .. }));
    }

    #[tokio::test]
    async fn test_approval_denial_never_reaches_transport() {
        let llm = MockLlmProvider::new()
            .push_tool_calls(vec![lookup_call("c1")])
            .push_text("done without the tool");
        let transport = MockToolTransport::new().with_text_result("search:web_lookup", "secret");
        let transport_probe = transport.clone();

        let backend = Arc::new(MockModerationBackend::allowing());
        let gate = Arc::new(SecurityCheckGate::new(backend, GuardConfig::default()));
        let tools = Arc::new(ToolExecutionEngine::new(
            Arc::new(transport),
            Arc::clone(&gate),
            EngineConfig::default(),
        ));
        let approval = Arc::new(ApprovalManager::new(Arc::new(GrantStore::new())));
        approval.register_handler(Arc::new(DenyAllHandler)).await;

        let engine = AgentLoopEngine::new(
            Arc::new(llm),
            tools,
            gate,
            approval,
            Arc::new(QueuedInput::new(&[])),
            AgentConfig {
                require_approval: true,
                ..AgentConfig::default()
            },
        );
        let publisher = CollectingPublisher::new();
        let cancel = CancellationToken::new();

        let mut messages = vec![Message::user("use the tool")];
        let outcome = engine
            .run(&mut messages, "", &[lookup_def()], "alice", &publisher, &cancel)
            .await;

        assert!(matches!(outcome, AgentOutcome::Done { .. }));
        assert!(publisher.has_event("approval_requested"));
        assert_eq!(publisher.count_of("tool_error"), 1);
        // The transport was never touched
        assert!(transport_probe.invocations().is_empty());
        // The model saw the denial as a tool failure
        assert!(
            messages
                .iter()
                .any(|m| matches!(&m.content, colloquy_llm::MessageContent::ToolResult(r) if r.is_error))
        );
    }
}
