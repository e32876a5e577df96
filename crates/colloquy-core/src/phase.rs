//! Agent loop phases as seen on the event stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the agent reasoning loop.
///
/// `Done`, `Failed`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// Deciding the next action via one LLM call.
    Planning,
    /// Dispatching emitted tool calls.
    Acting,
    /// Folding tool results back into context.
    Observing,
    /// Suspended awaiting external user input.
    AskUser,
    /// Finished with a final answer.
    Done,
    /// Terminated on an unrecoverable error.
    Failed,
    /// Terminated by an external stop signal.
    Cancelled,
}

impl AgentPhase {
    /// Whether the loop has terminated.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planning => "planning",
            Self::Acting => "acting",
            Self::Observing => "observing",
            Self::AskUser => "ask_user",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(AgentPhase::Done.is_terminal());
        assert!(AgentPhase::Failed.is_terminal());
        assert!(AgentPhase::Cancelled.is_terminal());
        assert!(!AgentPhase::Planning.is_terminal());
        assert!(!AgentPhase::AskUser.is_terminal());
    }
}
