//! Colloquy Agent - the bounded multi-step reasoning loop.
//!
//! Agent mode runs an explicit state machine instead of a "loop until
//! done" coroutine: `PLANNING -> ACTING -> OBSERVING -> (PLANNING |
//! ASK_USER | DONE | FAILED | CANCELLED)`. Every transition is a discrete
//! function of loop state, suspension points (ask-user, tool approval) are
//! explicit wait conditions, and a configurable step bound guarantees
//! termination. The loop returns a candidate answer; it never publishes
//! `chat_response` itself — that authority stays with the orchestrator.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod engine;
mod input;
mod state;

pub use engine::{ASK_USER_TOOL, AgentConfig, AgentLoopEngine};
pub use input::UserInputSource;
pub use state::{AgentAction, AgentOutcome, AgentStep};
