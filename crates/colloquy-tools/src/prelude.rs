//! Prelude module - commonly used types for convenient import.

pub use crate::catalog::{ToolCatalog, ToolDescriptor};
pub use crate::engine::{EngineConfig, ToolExecutionEngine};
pub use crate::envelope::{ArtifactRef, ToolOutcome, normalize_envelope};
pub use crate::error::{ToolsError, ToolsResult};
pub use crate::retrieval::{HttpRetrievalClient, RetrievalClient, Snippet};
pub use crate::transport::{HttpToolTransport, ToolTransport};
