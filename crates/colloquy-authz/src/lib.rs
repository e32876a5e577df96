//! Colloquy Authz - the tool authorization policy.
//!
//! A pure, fail-closed filter: given the user's groups, an optional
//! compliance filter, and a requested tool set, it returns the subset the
//! user may invoke. Untagged tools are excluded whenever a compliance
//! filter is active — the opposite default from the moderation gate, which
//! fails open. The two policies are deliberately separate crates so a
//! refactor of one cannot quietly change the other's failure direction.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod policy;

pub use policy::{ComplianceFilter, ToolAuthorizationPolicy};
