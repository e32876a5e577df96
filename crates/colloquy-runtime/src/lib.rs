//! Colloquy Runtime - the per-turn orchestration engine.
//!
//! For every inbound user message the [`Orchestrator`] picks an execution
//! mode, authorizes which tools the user may invoke, runs the moderation
//! gate on the input, delegates to a mode runner (plain, tools, RAG, or
//! the agent loop), gates the candidate output, and publishes exactly the
//! right event sequence — never revealing content that failed moderation.
//!
//! Sessions live in the [`SessionStore`], keyed and locked per session id;
//! turns for one session serialize on that lock while sessions stay fully
//! independent of each other.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod config_bridge;
pub mod prelude;

mod control;
mod error;
mod modes;
mod orchestrator;
mod session;
mod store;

pub use control::ChannelInputSource;
pub use error::{RuntimeError, RuntimeResult};
pub use modes::{CandidateResponse, ModeRunner, PlainMode, RagMode, ToolsMode, TurnContext};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use session::{SerializableSession, Session, SessionMetadata};
pub use store::SessionStore;
