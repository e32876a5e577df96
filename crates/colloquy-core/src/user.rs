//! User identity as seen by the orchestration engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The identity the engine authorizes against.
///
/// Authentication itself happens in the web transport; by the time a
/// message reaches the orchestrator the profile is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login name, forwarded to the moderation endpoint and tool transport.
    pub username: String,
    /// Group memberships used for tool authorization.
    pub groups: BTreeSet<String>,
}

impl UserProfile {
    /// Create a profile with no group memberships.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            groups: BTreeSet::new(),
        }
    }

    /// Add a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Check membership in a group.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_groups() {
        let user = UserProfile::new("alice")
            .with_group("analysts")
            .with_group("staff");
        assert!(user.in_group("analysts"));
        assert!(!user.in_group("admins"));
    }

    #[test]
    fn test_groups_are_a_set() {
        let user = UserProfile::new("bob").with_group("staff").with_group("staff");
        assert_eq!(user.groups.len(), 1);
    }
}
