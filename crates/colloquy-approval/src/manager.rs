//! Approval manager — orchestrates the confirmation flow.
//!
//! 1. Check if an existing grant covers the call
//! 2. If not, send an [`ApprovalRequest`] to the registered handler
//! 3. Timeout, missing handler, or no response all resolve to an
//!    implicit denial — the approval gate fails closed

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use colloquy_core::ToolRef;

use crate::grants::GrantStore;
use crate::request::{ApprovalDecision, ApprovalRequest, ApprovalResponse};

/// Default approval timeout (5 minutes).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Trait for UI implementations that present approval requests to users.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Present an approval request and wait for the user's response.
    ///
    /// Returns `None` if the user did not respond.
    async fn request_approval(&self, request: ApprovalRequest) -> Option<ApprovalResponse>;

    /// Whether the handler can currently reach the user.
    fn is_available(&self) -> bool;
}

/// The outcome of an approval check.
#[derive(Debug)]
pub enum ApprovalOutcome {
    /// The call may proceed.
    Allowed {
        /// How the call was authorized.
        proof: ApprovalProof,
    },
    /// The call was denied.
    Denied {
        /// Reason for denial.
        reason: String,
    },
}

impl ApprovalOutcome {
    /// Check if this outcome allows the call to proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// How a call was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalProof {
    /// Covered by a previously stored grant.
    ExistingGrant,
    /// Approved for this call only.
    OneTime,
    /// Approved with a new grant (now stored).
    NewGrant,
}

/// The approval manager.
pub struct ApprovalManager {
    /// Stored grants for the session.
    grants: Arc<GrantStore>,
    /// The approval handler (UI frontend).
    handler: RwLock<Option<Arc<dyn ApprovalHandler>>>,
    /// Timeout for waiting on approval responses.
    timeout: RwLock<Duration>,
}

impl ApprovalManager {
    /// Create a new approval manager.
    #[must_use]
    pub fn new(grants: Arc<GrantStore>) -> Self {
        Self {
            grants,
            handler: RwLock::new(None),
            timeout: RwLock::new(DEFAULT_TIMEOUT),
        }
    }

    /// Register an approval handler (UI frontend).
    pub async fn register_handler(&self, handler: Arc<dyn ApprovalHandler>) {
        *self.handler.write().await = Some(handler);
    }

    /// Set the approval timeout.
    pub async fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write().await = timeout;
    }

    /// Check whether a tool call may proceed.
    pub async fn check_approval(
        &self,
        tool: &ToolRef,
        tool_call_id: &str,
        context: impl Into<String>,
    ) -> ApprovalOutcome {
        // Step 1: an existing grant covers the call
        if self.grants.covers(tool) {
            debug!(tool = %tool, "Covered by existing grant");
            return ApprovalOutcome::Allowed {
                proof: ApprovalProof::ExistingGrant,
            };
        }

        // Step 2: we need the user
        let handler = {
            let guard = self.handler.read().await;
            match guard.as_ref() {
                Some(h) => Arc::clone(h),
                None => {
                    return ApprovalOutcome::Denied {
                        reason: "no approval handler registered".to_string(),
                    };
                },
            }
        };

        if !handler.is_available() {
            return ApprovalOutcome::Denied {
                reason: "approval handler unavailable".to_string(),
            };
        }

        let request = ApprovalRequest::new(tool_call_id, tool.clone(), context);
        let timeout = *self.timeout.read().await;
        let response = tokio::time::timeout(timeout, handler.request_approval(request)).await;

        match response {
            // Timeout is an implicit denial
            Err(_) => {
                warn!(tool = %tool, "Approval request timed out, denying");
                ApprovalOutcome::Denied {
                    reason: "approval request timed out".to_string(),
                }
            },
            // No response from the user is an implicit denial
            Ok(None) => ApprovalOutcome::Denied {
                reason: "user did not respond".to_string(),
            },
            Ok(Some(response)) => self.handle_response(tool, response),
        }
    }

    /// Process an approval response from the handler.
    fn handle_response(&self, tool: &ToolRef, response: ApprovalResponse) -> ApprovalOutcome {
        match response.decision {
            ApprovalDecision::ApproveOnce => ApprovalOutcome::Allowed {
                proof: ApprovalProof::OneTime,
            },
            ApprovalDecision::ApproveScoped { scope } => {
                self.grants.add(scope, tool.clone());
                ApprovalOutcome::Allowed {
                    proof: ApprovalProof::NewGrant,
                }
            },
            ApprovalDecision::Deny { reason } => ApprovalOutcome::Denied { reason },
        }
    }

    /// Get a reference to the grant store.
    #[must_use]
    pub fn grants(&self) -> &GrantStore {
        &self.grants
    }
}

impl std::fmt::Debug for ApprovalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalManager")
            .field("grants", &self.grants)
            .finish_non_exhaustive()
    }
}
