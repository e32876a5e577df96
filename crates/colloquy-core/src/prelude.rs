//! Prelude module - commonly used types for convenient import.
//!
//! Use `use colloquy_core::prelude::*;` to import all essential types.

pub use crate::check::{CheckStatus, CheckType};
pub use crate::ids::SessionId;
pub use crate::mode::ChatMode;
pub use crate::phase::AgentPhase;
pub use crate::refs::{SourceRef, ToolRef};
pub use crate::user::UserProfile;
