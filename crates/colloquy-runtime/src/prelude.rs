//! Prelude module - commonly used types for convenient import.
//!
//! Use `use colloquy_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Orchestration
pub use crate::{Orchestrator, OrchestratorConfig};

// Sessions
pub use crate::{SerializableSession, Session, SessionMetadata, SessionStore};

// Modes
pub use crate::{CandidateResponse, ModeRunner, PlainMode, RagMode, ToolsMode, TurnContext};

// Control plumbing
pub use crate::ChannelInputSource;

// Re-export the vocabulary most callers need alongside the runtime
pub use colloquy_core::{ChatMode, SessionId, UserProfile};
