//! Broadcast event bus.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::ChatEvent;
use crate::publisher::EventPublisher;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus broadcasting events to all subscribers.
///
/// Events are delivered asynchronously and in publication order. A clone
/// shares the same underlying channel.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events.
    sender: broadcast::Sender<Arc<ChatEvent>>,
    /// Channel capacity.
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Subscribe to events.
    ///
    /// Returns a receiver that will receive all events published after
    /// the subscription.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: ChatEvent) {
        let event = Arc::new(event);
        trace!(event_type = %event.event_type(), "Publishing event");
        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            debug!(
                event_type = %event.event_type(),
                receiver_count = count,
                "Event published"
            );
        } else {
            // No receivers - this is fine
            trace!(event_type = %event.event_type(), "No receivers for event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

/// Receiver for events from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<ChatEvent>>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` when the channel is closed. Lagged receivers skip
    /// dropped events and keep receiving.
    pub async fn recv(&mut self) -> Option<Arc<ChatEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<ChatEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> ChatEvent {
        ChatEvent::ChatResponse {
            content: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(sample_event());

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "chat_response");
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();

        bus.publish(sample_event());

        assert!(receiver1.recv().await.is_some());
        assert!(receiver2.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        // Must not panic or error
        bus.publish(sample_event());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(ChatEvent::ToolStart {
            tool_call_id: "c1".to_string(),
            tool_name: "a:b".to_string(),
        });
        bus.publish(ChatEvent::ToolComplete {
            tool_call_id: "c1".to_string(),
            success: true,
        });

        assert_eq!(receiver.recv().await.unwrap().event_type(), "tool_start");
        assert_eq!(receiver.recv().await.unwrap().event_type(), "tool_complete");
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_cloned_bus_shares_channel() {
        let bus = EventBus::new();
        let cloned = bus.clone();
        let mut receiver = bus.subscribe();

        cloned.publish(sample_event());
        assert!(receiver.recv().await.is_some());
    }
}
