//! Colloquy Core - shared vocabulary for the chat orchestration engine.
//!
//! This crate holds the types that every other crate speaks: session and
//! user identity, tool and source references, execution modes, moderation
//! check vocabulary, and the agent loop phases. It deliberately has no
//! I/O and no dependencies on the rest of the workspace.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod check;
pub mod ids;
pub mod mode;
pub mod phase;
pub mod prelude;
pub mod refs;
pub mod user;

pub use check::{CheckStatus, CheckType};
pub use ids::SessionId;
pub use mode::ChatMode;
pub use phase::AgentPhase;
pub use refs::{SourceRef, ToolRef};
pub use user::UserProfile;
