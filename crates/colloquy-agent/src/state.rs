//! Agent loop state records.

use serde::{Deserialize, Serialize};

/// What the loop did in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    /// A planning call decided the next move.
    Think,
    /// Tool calls were dispatched.
    Act,
    /// Tool results were folded back into context.
    Observe,
    /// The loop asked the user a question.
    AskUser,
    /// The loop produced a final answer.
    Done,
}

/// One step of an agent turn.
///
/// The step trace lives only for the duration of the turn; it is logged
/// and discarded on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    /// Step index, starting at zero.
    pub index: usize,
    /// What happened in this step.
    pub action: AgentAction,
    /// Tool call IDs dispatched in this step.
    pub tool_calls: Vec<String>,
    /// Observation folded into context, if any.
    pub observation: Option<String>,
}

impl AgentStep {
    /// Create a step record.
    #[must_use]
    pub fn new(index: usize, action: AgentAction) -> Self {
        Self {
            index,
            action,
            tool_calls: Vec::new(),
            observation: None,
        }
    }

    /// Attach dispatched tool call IDs.
    #[must_use]
    pub fn with_tool_calls(mut self, ids: Vec<String>) -> Self {
        self.tool_calls = ids;
        self
    }

    /// Attach an observation.
    #[must_use]
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }
}

/// Terminal result of an agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The loop finished with a candidate answer.
    Done {
        /// The answer, not yet past the output gate.
        answer: String,
        /// Steps taken.
        steps: usize,
    },
    /// The loop hit an unrecoverable error.
    Failed {
        /// Non-sensitive failure description.
        reason: String,
        /// Steps taken before failure.
        steps: usize,
    },
    /// The loop was stopped by an external signal.
    Cancelled {
        /// Steps taken before cancellation.
        steps: usize,
    },
}

impl AgentOutcome {
    /// Steps taken before the loop terminated.
    #[must_use]
    pub fn steps(&self) -> usize {
        match self {
            Self::Done { steps, .. } | Self::Failed { steps, .. } | Self::Cancelled { steps } => {
                *steps
            },
        }
    }
}
