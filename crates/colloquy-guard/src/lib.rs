//! Colloquy Guard - the content moderation gate.
//!
//! Every piece of content headed toward the model or the user passes one of
//! four checkpoints (input, output, tool, rag) before it may proceed. The
//! gate consults an external moderation endpoint and **fails open**: if the
//! endpoint is unreachable or slow, content proceeds as `good` and the
//! failure is counted. This is the opposite of tool authorization, which
//! fails closed — the asymmetry is intentional and the two policies live in
//! separate crates so neither can silently inherit the other's default.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod backend;
mod error;
mod gate;
mod types;

pub use backend::{HttpModerationBackend, ModerationBackend};
pub use error::{GuardError, GuardResult};
pub use gate::{GuardConfig, SecurityCheckGate};
pub use types::{HistoryEntry, ModerationRequest, SecurityCheckResult};
