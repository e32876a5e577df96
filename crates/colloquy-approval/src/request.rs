//! Approval request and response types.

use colloquy_core::ToolRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// Breadth of an approval grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalScope {
    /// This `server:tool` only.
    Function,
    /// Every tool on the declaring server.
    Server,
    /// Every tool.
    Global,
}

impl fmt::Display for ApprovalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Function => "function",
            Self::Server => "server",
            Self::Global => "global",
        };
        write!(f, "{name}")
    }
}

/// A request for human confirmation of one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The tool call awaiting confirmation.
    pub tool_call_id: String,
    /// The tool being invoked.
    pub tool: ToolRef,
    /// Why the agent wants to make this call.
    pub context: String,
}

impl ApprovalRequest {
    /// Create a new approval request.
    pub fn new(tool_call_id: impl Into<String>, tool: ToolRef, context: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            tool_call_id: tool_call_id.into(),
            tool,
            context: context.into(),
        }
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.tool, self.context)
    }
}

/// The decision made on an approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum ApprovalDecision {
    /// One-time approval — this call executes, no grant is stored.
    ApproveOnce,
    /// Approval with a stored grant covering later calls in its scope.
    ApproveScoped {
        /// Grant breadth.
        scope: ApprovalScope,
    },
    /// Deny the call.
    Deny {
        /// Reason for denial.
        reason: String,
    },
}

impl ApprovalDecision {
    /// Check if this decision approves the call.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        !matches!(self, Self::Deny { .. })
    }

    /// The grant scope, if this decision stores one.
    #[must_use]
    pub fn grant_scope(&self) -> Option<ApprovalScope> {
        match self {
            Self::ApproveScoped { scope } => Some(*scope),
            _ => None,
        }
    }
}

/// Response to an approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    /// The request this response addresses.
    pub request_id: RequestId,
    /// The decision made.
    pub decision: ApprovalDecision,
}

impl ApprovalResponse {
    /// Create a new approval response.
    #[must_use]
    pub fn new(request_id: RequestId, decision: ApprovalDecision) -> Self {
        Self {
            request_id,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("req:"));
    }

    #[test]
    fn test_decision_approval() {
        assert!(ApprovalDecision::ApproveOnce.is_approved());
        assert!(
            ApprovalDecision::ApproveScoped {
                scope: ApprovalScope::Server
            }
            .is_approved()
        );
        assert!(
            !ApprovalDecision::Deny {
                reason: "too risky".to_string()
            }
            .is_approved()
        );
    }

    #[test]
    fn test_grant_scope_only_for_scoped() {
        assert!(ApprovalDecision::ApproveOnce.grant_scope().is_none());
        assert_eq!(
            ApprovalDecision::ApproveScoped {
                scope: ApprovalScope::Global
            }
            .grant_scope(),
            Some(ApprovalScope::Global)
        );
    }
}
