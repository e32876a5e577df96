//! Moderation request and result types.

use colloquy_core::{CheckStatus, CheckType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of conversation history sent to the moderation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Role of the speaker (`user`, `assistant`, `tool`).
    pub role: String,
    /// Message text.
    pub content: String,
}

impl HistoryEntry {
    /// Create a new history entry.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request sent to the moderation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationRequest {
    /// Content under review.
    pub content: String,
    /// Which content stream this is.
    pub check_type: CheckType,
    /// User on whose behalf the content flows.
    pub username: String,
    /// Recent conversation history for context.
    pub history: Vec<HistoryEntry>,
}

/// Verdict from the moderation endpoint.
///
/// Never persisted beyond the turn; used only to gate publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityCheckResult {
    /// The classification.
    pub status: CheckStatus,
    /// Generic notice text, safe to surface to the user.
    #[serde(default)]
    pub message: String,
    /// Endpoint-specific detail. Logged, never shown to the user.
    #[serde(default)]
    pub details: Option<Value>,
}

impl SecurityCheckResult {
    /// A `good` verdict with no message.
    #[must_use]
    pub fn good() -> Self {
        Self {
            status: CheckStatus::Good,
            message: String::new(),
            details: None,
        }
    }

    /// A `warning` verdict.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warning,
            message: message.into(),
            details: None,
        }
    }

    /// A `blocked` verdict.
    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Blocked,
            message: message.into(),
            details: None,
        }
    }

    /// Whether this verdict blocks the content.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.status == CheckStatus::Blocked
    }
}
