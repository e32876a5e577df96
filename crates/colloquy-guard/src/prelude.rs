//! Prelude module - commonly used types for convenient import.

pub use crate::backend::{HttpModerationBackend, ModerationBackend};
pub use crate::error::{GuardError, GuardResult};
pub use crate::gate::{GuardConfig, SecurityCheckGate};
pub use crate::types::{HistoryEntry, ModerationRequest, SecurityCheckResult};
