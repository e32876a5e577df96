//! The authorization filter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use colloquy_tools::ToolDescriptor;

/// Explicit allow-list of compliance levels.
///
/// When a filter is active, only tools whose declared level appears in the
/// list pass; a tool with no declared level is excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFilter {
    /// Allowed compliance levels.
    pub allowed: BTreeSet<String>,
}

impl ComplianceFilter {
    /// Create a filter allowing the given levels.
    pub fn new(levels: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: levels.into_iter().collect(),
        }
    }

    /// Whether a tool with the given declared level passes this filter.
    #[must_use]
    pub fn permits(&self, level: Option<&str>) -> bool {
        level.is_some_and(|l| self.allowed.contains(l))
    }
}

/// The tool authorization policy.
///
/// `authorize` is a pure function of its inputs: no side effects, no
/// clock, no I/O. It is idempotent and order-independent — the output is
/// always a subset of the input, deduplicated and sorted by `server:tool`
/// name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolAuthorizationPolicy;

impl ToolAuthorizationPolicy {
    /// Filter `requested` down to the tools this user may invoke.
    ///
    /// A tool is allowed iff its declaring server's groups intersect
    /// `user_groups`, and — when `compliance_filter` is set — its declared
    /// compliance level is in the filter's allow-list.
    #[must_use]
    pub fn authorize(
        user_groups: &BTreeSet<String>,
        compliance_filter: Option<&ComplianceFilter>,
        requested: &[ToolDescriptor],
    ) -> Vec<ToolDescriptor> {
        let mut allowed: Vec<ToolDescriptor> = requested
            .iter()
            .filter(|tool| {
                let group_ok = tool.groups.iter().any(|g| user_groups.contains(g));
                let compliance_ok = compliance_filter
                    .is_none_or(|f| f.permits(tool.compliance_level.as_deref()));
                group_ok && compliance_ok
            })
            .cloned()
            .collect();

        // Set semantics: deduplicate and order by name so the result is
        // independent of request order.
        allowed.sort_by(|a, b| a.full_name().cmp(&b.full_name()));
        allowed.dedup_by(|a, b| a.full_name() == b.full_name());
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn tool(server: &str, name: &str, server_groups: &[&str]) -> ToolDescriptor {
        let mut t = ToolDescriptor::new(server, name);
        for g in server_groups {
            t = t.with_group(*g);
        }
        t
    }

    #[test]
    fn test_group_intersection_required() {
        let requested = vec![
            tool("search", "web_lookup", &["staff"]),
            tool("hr", "payroll", &["hr-admins"]),
        ];

        let allowed =
            ToolAuthorizationPolicy::authorize(&groups(&["staff"]), None, &requested);
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].full_name(), "search:web_lookup");
    }

    #[test]
    fn test_no_groups_means_nothing_allowed() {
        let requested = vec![tool("search", "web_lookup", &["staff"])];
        let allowed = ToolAuthorizationPolicy::authorize(&groups(&[]), None, &requested);
        assert!(allowed.is_empty());
    }

    #[test]
    fn test_compliance_filter_excludes_untagged() {
        let requested = vec![
            tool("search", "tagged", &["staff"]).with_compliance_level("low"),
            tool("search", "untagged", &["staff"]),
        ];
        let filter = ComplianceFilter::new(["low".to_string()]);

        let allowed =
            ToolAuthorizationPolicy::authorize(&groups(&["staff"]), Some(&filter), &requested);
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].name, "tagged");
    }

    #[test]
    fn test_compliance_filter_excludes_unlisted_level() {
        let requested = vec![tool("search", "risky", &["staff"]).with_compliance_level("high")];
        let filter = ComplianceFilter::new(["low".to_string()]);

        let allowed =
            ToolAuthorizationPolicy::authorize(&groups(&["staff"]), Some(&filter), &requested);
        assert!(allowed.is_empty());
    }

    #[test]
    fn test_no_filter_admits_untagged() {
        let requested = vec![tool("search", "untagged", &["staff"])];
        let allowed = ToolAuthorizationPolicy::authorize(&groups(&["staff"]), None, &requested);
        assert_eq!(allowed.len(), 1);
    }

    #[test]
    fn test_result_is_subset_of_request() {
        let requested = vec![
            tool("a", "x", &["g1"]),
            tool("b", "y", &["g2"]),
            tool("c", "z", &["g1", "g3"]),
        ];
        let allowed = ToolAuthorizationPolicy::authorize(&groups(&["g1", "g2"]), None, &requested);

        let requested_names: BTreeSet<String> =
            requested.iter().map(ToolDescriptor::full_name).collect();
        assert!(
            allowed
                .iter()
                .all(|t| requested_names.contains(&t.full_name()))
        );
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let forward = vec![
            tool("a", "x", &["g1"]),
            tool("b", "y", &["g1"]),
            tool("c", "z", &["other"]),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let user = groups(&["g1"]);
        let first = ToolAuthorizationPolicy::authorize(&user, None, &forward);
        let second = ToolAuthorizationPolicy::authorize(&user, None, &forward);
        let from_reversed = ToolAuthorizationPolicy::authorize(&user, None, &reversed);

        let names = |tools: &[ToolDescriptor]| -> Vec<String> {
            tools.iter().map(ToolDescriptor::full_name).collect()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), names(&from_reversed));
    }

    #[test]
    fn test_duplicates_collapse() {
        let requested = vec![tool("a", "x", &["g1"]), tool("a", "x", &["g1"])];
        let allowed = ToolAuthorizationPolicy::authorize(&groups(&["g1"]), None, &requested);
        assert_eq!(allowed.len(), 1);
    }
}
