//! Moderation check vocabulary.
//!
//! Four content streams pass through the moderation gate; each carries its
//! own check type so the endpoint can apply stream-specific policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which content stream is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    /// Inbound user message.
    Input,
    /// Candidate assistant response.
    Output,
    /// Tool result payload.
    Tool,
    /// Retrieved document content.
    Rag,
}

impl CheckType {
    /// All check types, in gate order.
    pub const ALL: [Self; 4] = [Self::Input, Self::Output, Self::Tool, Self::Rag];
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Tool => "tool",
            Self::Rag => "rag",
        };
        write!(f, "{name}")
    }
}

/// Verdict from the moderation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Content may proceed.
    Good,
    /// Content may proceed; a warning notification is emitted first.
    Warning,
    /// Content must not be published and is stripped from history.
    Blocked,
}

impl CheckStatus {
    /// Whether content with this status may reach the publisher.
    #[must_use]
    pub fn allows_publication(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Blocked => "blocked",
        };
        write!(f, "{name}")
    }
}
