//! Prelude module - commonly used types for convenient import.

pub use crate::bus::{EventBus, EventReceiver};
pub use crate::event::ChatEvent;
pub use crate::publisher::EventPublisher;
