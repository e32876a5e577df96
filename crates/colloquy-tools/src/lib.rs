//! Colloquy Tools - tool catalog, transport, and execution engine.
//!
//! Tool calls emitted by the model are dispatched to a remote tool
//! transport, possibly many at once. Every success payload passes the
//! moderation gate before it is allowed back into the conversation, and
//! results merge in the order the model emitted the calls regardless of
//! completion order. The retrieval (RAG) client lives here too: retrieval
//! is a tool-shaped collaborator whose content rides the `rag` checkpoint.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod catalog;
mod engine;
mod envelope;
mod error;
mod retrieval;
mod transport;

pub use catalog::{ToolCatalog, ToolDescriptor};
pub use engine::{EngineConfig, ToolExecutionEngine};
pub use envelope::{ArtifactRef, ToolOutcome, normalize_envelope};
pub use error::{ToolsError, ToolsResult};
pub use retrieval::{HttpRetrievalClient, RetrievalClient, Snippet};
pub use transport::{HttpToolTransport, ToolTransport};
