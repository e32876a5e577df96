//! The event union produced toward the web transport.

use colloquy_core::{AgentPhase, CheckStatus, CheckType};
use serde::{Deserialize, Serialize};

/// An event on the per-session stream toward the user.
///
/// `ChatResponse` and `ResponseComplete` may only ever be emitted by the
/// orchestrator, after the output-side moderation check has resolved to a
/// non-blocked status. Everything else may be emitted by the component that
/// owns the underlying state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A tool call is about to be dispatched.
    ToolStart {
        /// Correlation key for this call.
        tool_call_id: String,
        /// Tool name in `server:tool` form.
        tool_name: String,
    },
    /// A tool call finished.
    ToolComplete {
        /// Correlation key for this call.
        tool_call_id: String,
        /// Whether the tool reported success.
        success: bool,
    },
    /// A tool call failed (transport error, timeout, or policy block).
    ToolError {
        /// Correlation key for this call.
        tool_call_id: String,
        /// Non-sensitive error description.
        error: String,
    },
    /// The moderation gate flagged or blocked content.
    SecurityWarning {
        /// The verdict (`warning` or `blocked`).
        status: CheckStatus,
        /// Generic, non-sensitive notice text.
        message: String,
        /// Which content stream was checked.
        check_type: CheckType,
    },
    /// The agent loop changed phase.
    AgentUpdate {
        /// Step index, starting at zero.
        step: usize,
        /// The phase entered.
        state: AgentPhase,
    },
    /// The agent loop needs approval for a tool call.
    ApprovalRequested {
        /// Correlation key for the gated call.
        tool_call_id: String,
        /// Tool name in `server:tool` form.
        tool_name: String,
    },
    /// The agent loop is asking the user a clarifying question.
    AgentQuestion {
        /// The question text. Questions are model output and pass the
        /// output checkpoint before this event is emitted.
        content: String,
    },
    /// The turn ended on an error. Carries only a coarse category and a
    /// non-sensitive message; full detail goes to the logs.
    TurnError {
        /// Coarse error category (e.g. `provider_unavailable`).
        category: String,
        /// Actionable, non-sensitive message.
        message: String,
    },
    /// The finalized assistant response. Orchestrator-only.
    ChatResponse {
        /// Response text.
        content: String,
    },
    /// The turn is finished. Orchestrator-only.
    ResponseComplete {},
}

impl ChatEvent {
    /// Wire name of the event variant.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ToolStart { .. } => "tool_start",
            Self::ToolComplete { .. } => "tool_complete",
            Self::ToolError { .. } => "tool_error",
            Self::SecurityWarning { .. } => "security_warning",
            Self::AgentUpdate { .. } => "agent_update",
            Self::ApprovalRequested { .. } => "approval_requested",
            Self::AgentQuestion { .. } => "agent_question",
            Self::TurnError { .. } => "turn_error",
            Self::ChatResponse { .. } => "chat_response",
            Self::ResponseComplete {} => "response_complete",
        }
    }

    /// The tool call this event correlates to, if any.
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolStart { tool_call_id, .. }
            | Self::ToolComplete { tool_call_id, .. }
            | Self::ToolError { tool_call_id, .. }
            | Self::ApprovalRequested { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}
