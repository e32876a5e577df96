//! The per-turn orchestrator.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use colloquy_agent::{AgentConfig, AgentLoopEngine, AgentOutcome};
use colloquy_approval::ApprovalHandler;
use colloquy_authz::ToolAuthorizationPolicy;
use colloquy_core::{ChatMode, CheckStatus, CheckType, SessionId};
use colloquy_events::{ChatEvent, EventPublisher};
use colloquy_guard::SecurityCheckGate;
use colloquy_llm::{LlmProvider, LlmToolDefinition, Message};
use colloquy_tools::{RetrievalClient, ToolCatalog, ToolDescriptor, ToolExecutionEngine};

use crate::control::ChannelInputSource;
use crate::error::{RuntimeError, RuntimeResult};
use crate::modes::{ModeRunner, PlainMode, RagMode, ToolsMode, TurnContext};
use crate::session::Session;
use crate::store::SessionStore;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// System prompt for completion calls.
    pub system_prompt: String,
    /// How many recent messages accompany each moderation call.
    pub moderation_history: usize,
    /// Maximum messages retained per session.
    pub max_history: usize,
    /// Snippets requested per retrieval query.
    pub retrieval_top_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            moderation_history: 10,
            max_history: 200,
            retrieval_top_k: 5,
        }
    }
}

/// Composes the whole engine, one turn at a time.
///
/// The orchestrator is the only component that emits `chat_response` and
/// `response_complete`, and it does so only after the output-side
/// moderation check has resolved to a non-blocked status. A mode runner
/// never publishes speculatively.
pub struct Orchestrator {
    store: Arc<SessionStore>,
    llm: Arc<dyn LlmProvider>,
    catalog: ToolCatalog,
    gate: Arc<SecurityCheckGate>,
    engine: Arc<ToolExecutionEngine>,
    retrieval: Option<Arc<dyn RetrievalClient>>,
    publisher: Arc<dyn EventPublisher>,
    agent_config: AgentConfig,
    config: OrchestratorConfig,
    /// Cancellation tokens for in-flight agent turns, by session.
    cancellations: DashMap<SessionId, CancellationToken>,
    /// Input channels for suspended agent turns, by session.
    agent_inputs: DashMap<SessionId, mpsc::UnboundedSender<String>>,
}

impl Orchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        llm: Arc<dyn LlmProvider>,
        catalog: ToolCatalog,
        gate: Arc<SecurityCheckGate>,
        engine: Arc<ToolExecutionEngine>,
        publisher: Arc<dyn EventPublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            llm,
            catalog,
            gate,
            engine,
            retrieval: None,
            publisher,
            agent_config: AgentConfig::default(),
            config,
            cancellations: DashMap::new(),
            agent_inputs: DashMap::new(),
        }
    }

    /// Attach a retrieval client (enables RAG mode).
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalClient>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Set the agent loop configuration.
    #[must_use]
    pub fn with_agent_config(mut self, agent_config: AgentConfig) -> Self {
        self.agent_config = agent_config;
        self
    }

    /// The session store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one inbound user message.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SessionNotFound`] for an unknown session.
    /// Every other failure terminates the turn with a typed event and
    /// leaves the session usable for the next message.
    #[allow(clippy::too_many_lines)]
    pub async fn handle_message(
        &self,
        session_id: &SessionId,
        text: &str,
        mode: ChatMode,
    ) -> RuntimeResult<()> {
        let entry = self
            .store
            .get(session_id)
            .ok_or_else(|| RuntimeError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        // Turns for one session serialize on this lock.
        let mut session = entry.lock().await;

        info!(session_id = %session_id, mode = %mode, "Handling message");

        // Input checkpoint runs before the message enters history, so a
        // blocked input is never visible to any later read.
        let history = session.history_for_moderation(self.config.moderation_history);
        let verdict = self
            .gate
            .check(text, CheckType::Input, &session.user.username, history)
            .await;
        match verdict.status {
            CheckStatus::Blocked => {
                self.publisher.publish(ChatEvent::SecurityWarning {
                    status: CheckStatus::Blocked,
                    message: policy_notice(&verdict.message),
                    check_type: CheckType::Input,
                });
                return Ok(());
            },
            CheckStatus::Warning => {
                self.publisher.publish(ChatEvent::SecurityWarning {
                    status: CheckStatus::Warning,
                    message: policy_notice(&verdict.message),
                    check_type: CheckType::Input,
                });
            },
            CheckStatus::Good => {},
        }

        session.add_message(Message::user(text));

        let authorized = self.authorized_tools(&session);
        let tool_definitions: Vec<LlmToolDefinition> = authorized
            .iter()
            .map(ToolDescriptor::to_llm_definition)
            .collect();
        debug!(
            session_id = %session_id,
            authorized = authorized.len(),
            "Tool authorization resolved"
        );

        let candidate = match mode {
            ChatMode::Agent => {
                match self
                    .run_agent_turn(session_id, &mut session, &tool_definitions)
                    .await
                {
                    Some(answer) => answer,
                    None => return Ok(()),
                }
            },
            ChatMode::Plain | ChatMode::Tools | ChatMode::Rag => {
                let runner: Box<dyn ModeRunner> = if mode == ChatMode::Plain {
                    Box::new(PlainMode::new(Arc::clone(&self.llm)))
                } else if mode == ChatMode::Tools {
                    Box::new(ToolsMode::new(
                        Arc::clone(&self.llm),
                        Arc::clone(&self.engine),
                    ))
                } else {
                    let Some(retrieval) = self.retrieval.as_ref() else {
                        self.publisher.publish(ChatEvent::TurnError {
                            category: "configuration".to_string(),
                            message: "retrieval is not configured".to_string(),
                        });
                        return Ok(());
                    };
                    Box::new(RagMode::new(
                        Arc::clone(&self.llm),
                        Arc::clone(retrieval),
                        Arc::clone(&self.gate),
                        self.config.retrieval_top_k,
                    ))
                };

                let mut ctx = TurnContext {
                    session: &mut session,
                    tool_definitions: &tool_definitions,
                    system_prompt: &self.config.system_prompt,
                    publisher: self.publisher.as_ref(),
                };
                match runner.run(&mut ctx).await {
                    Ok(candidate) => candidate.content,
                    Err(e) => {
                        error!(session_id = %session_id, error = %e, "Turn failed");
                        self.publisher.publish(ChatEvent::TurnError {
                            category: e.user_category().to_string(),
                            message: "the assistant could not complete this turn".to_string(),
                        });
                        return Ok(());
                    },
                }
            },
        };

        // Output checkpoint strictly precedes any publish.
        let history = session.history_for_moderation(self.config.moderation_history);
        let verdict = self
            .gate
            .check(
                &candidate,
                CheckType::Output,
                &session.user.username,
                history,
            )
            .await;
        match verdict.status {
            CheckStatus::Blocked => {
                // The candidate is discarded before it ever enters history.
                self.publisher.publish(ChatEvent::SecurityWarning {
                    status: CheckStatus::Blocked,
                    message: policy_notice(&verdict.message),
                    check_type: CheckType::Output,
                });
                return Ok(());
            },
            CheckStatus::Warning => {
                self.publisher.publish(ChatEvent::SecurityWarning {
                    status: CheckStatus::Warning,
                    message: policy_notice(&verdict.message),
                    check_type: CheckType::Output,
                });
            },
            CheckStatus::Good => {},
        }

        session.add_message(Message::assistant(&candidate));
        session.metadata.turn_count = session.metadata.turn_count.saturating_add(1);
        session.enforce_history_cap(self.config.max_history);

        self.publisher.publish(ChatEvent::ChatResponse {
            content: candidate,
        });
        self.publisher.publish(ChatEvent::ResponseComplete {});
        Ok(())
    }

    /// Run an agent turn; returns the candidate answer, or `None` when the
    /// turn ended without one (failure or cancellation, already reported).
    async fn run_agent_turn(
        &self,
        session_id: &SessionId,
        session: &mut Session,
        tool_definitions: &[LlmToolDefinition],
    ) -> Option<String> {
        let cancel = CancellationToken::new();
        self.cancellations.insert(session_id.clone(), cancel.clone());
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        self.agent_inputs.insert(session_id.clone(), input_tx);

        let agent = AgentLoopEngine::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.engine),
            Arc::clone(&self.gate),
            Arc::clone(&session.approval),
            Arc::new(ChannelInputSource::new(input_rx)),
            self.agent_config.clone(),
        );

        // The loop works on a copy so that everything it appends flows
        // back through the session's versioned mutation path.
        let mut working = session.messages.clone();
        let before = working.len();
        let username = session.user.username.clone();
        let outcome = agent
            .run(
                &mut working,
                &self.config.system_prompt,
                tool_definitions,
                &username,
                self.publisher.as_ref(),
                &cancel,
            )
            .await;

        self.cancellations.remove(session_id);
        self.agent_inputs.remove(session_id);

        for message in working.drain(before..) {
            session.add_message(message);
        }

        match outcome {
            AgentOutcome::Done { answer, steps } => {
                debug!(session_id = %session_id, steps, "Agent turn produced an answer");
                Some(answer)
            },
            AgentOutcome::Failed { reason, steps } => {
                warn!(session_id = %session_id, steps, reason = %reason, "Agent turn failed");
                self.publisher.publish(ChatEvent::TurnError {
                    category: "agent_failed".to_string(),
                    message: reason,
                });
                None
            },
            AgentOutcome::Cancelled { steps } => {
                info!(session_id = %session_id, steps, "Agent turn cancelled");
                None
            },
        }
    }

    /// Resolve the tools this session's user may invoke this turn.
    fn authorized_tools(&self, session: &Session) -> Vec<ToolDescriptor> {
        let requested = if session.selected_tools.is_empty() {
            self.catalog.descriptors().to_vec()
        } else {
            self.catalog.select(&session.selected_tools)
        };
        ToolAuthorizationPolicy::authorize(
            &session.user.groups,
            session.compliance_filter.as_ref(),
            &requested,
        )
    }

    /// Handle the `reset_session` lifecycle control.
    pub async fn reset_session(&self, session_id: &SessionId) -> bool {
        self.stop_agent(session_id);
        self.store.reset(session_id).await
    }

    /// Handle the `agent_control{action: stop}` lifecycle control.
    ///
    /// Cooperative: the in-flight call completes before the loop stops.
    pub fn stop_agent(&self, session_id: &SessionId) {
        if let Some(token) = self.cancellations.get(session_id) {
            info!(session_id = %session_id, "Stop requested for agent turn");
            token.cancel();
        }
    }

    /// Handle the `agent_user_input{content}` lifecycle control.
    pub fn submit_agent_input(&self, session_id: &SessionId, content: impl Into<String>) {
        match self.agent_inputs.get(session_id) {
            Some(sender) => {
                if sender.send(content.into()).is_err() {
                    debug!(session_id = %session_id, "Agent input channel already closed");
                }
            },
            None => {
                debug!(session_id = %session_id, "No agent turn awaiting input");
            },
        }
    }

    /// Register the approval handler for a session's agent turns.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SessionNotFound`] for an unknown session.
    pub async fn register_approval_handler(
        &self,
        session_id: &SessionId,
        handler: Arc<dyn ApprovalHandler>,
    ) -> RuntimeResult<()> {
        let entry = self
            .store
            .get(session_id)
            .ok_or_else(|| RuntimeError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        let session = entry.lock().await;
        session.approval.register_handler(handler).await;
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("catalog_size", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

/// Reduce a moderation message to a generic, user-safe policy notice.
///
/// Moderation internals never reach the user; an empty endpoint message
/// falls back to a fixed notice.
fn policy_notice(message: &str) -> String {
    if message.is_empty() {
        "This content conflicts with the usage policy.".to_string()
    } else {
        message.to_string()
    }
}
