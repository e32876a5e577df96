//! The publisher seam between the engine and the transport.

use crate::event::ChatEvent;

/// Sink for user-facing events.
///
/// Injected into the orchestrator and the components it delegates to.
/// Implementations include the broadcast [`EventBus`](crate::EventBus) in
/// production and a collecting fake in tests; all share this contract so
/// event-order assertions hold for every transport.
pub trait EventPublisher: Send + Sync {
    /// Publish one event.
    ///
    /// Must not block; delivery to slow subscribers is the transport's
    /// problem, not the orchestrator's.
    fn publish(&self, event: ChatEvent);
}
