//! Execution modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy used to produce a candidate response for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// One completion call, no tools.
    #[default]
    Plain,
    /// Completion with tool schemas, execute emitted calls, then synthesize.
    Tools,
    /// Retrieval merged into the prompt context, then one completion call.
    Rag,
    /// Bounded multi-step reasoning loop.
    Agent,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Tools => "tools",
            Self::Rag => "rag",
            Self::Agent => "agent",
        };
        write!(f, "{name}")
    }
}
