//! Session-lifetime approval grants.

use colloquy_core::ToolRef;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::request::ApprovalScope;

/// A stored approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Grant breadth.
    pub scope: ApprovalScope,
    /// The tool the grant was made for. For `Server` scope only the
    /// server half matters; for `Global` neither does.
    pub tool: ToolRef,
}

impl Grant {
    /// Whether this grant covers a call to `tool`.
    #[must_use]
    pub fn covers(&self, tool: &ToolRef) -> bool {
        match self.scope {
            ApprovalScope::Function => self.tool == *tool,
            ApprovalScope::Server => self.tool.server == tool.server,
            ApprovalScope::Global => true,
        }
    }
}

/// Store of grants for one session.
///
/// Grants live until the session ends or the store is cleared; denials are
/// never stored.
#[derive(Debug, Default)]
pub struct GrantStore {
    grants: Mutex<Vec<Grant>>,
}

impl GrantStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a grant.
    pub fn add(&self, scope: ApprovalScope, tool: ToolRef) {
        if let Ok(mut grants) = self.grants.lock() {
            grants.push(Grant { scope, tool });
        }
    }

    /// Whether any stored grant covers a call to `tool`.
    #[must_use]
    pub fn covers(&self, tool: &ToolRef) -> bool {
        self.grants
            .lock()
            .map(|grants| grants.iter().any(|g| g.covers(tool)))
            .unwrap_or(false)
    }

    /// Number of stored grants.
    #[must_use]
    pub fn count(&self) -> usize {
        self.grants.lock().map(|g| g.len()).unwrap_or(0)
    }

    /// Drop all grants.
    pub fn clear(&self) {
        if let Ok(mut grants) = self.grants.lock() {
            grants.clear();
        }
    }
}
