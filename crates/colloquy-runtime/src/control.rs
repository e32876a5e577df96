//! Session lifecycle control plumbing.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use colloquy_agent::UserInputSource;

/// Routes `agent_user_input` control messages into a suspended agent turn.
///
/// The orchestrator creates one per agent turn and keeps the sender half;
/// the agent loop awaits on the receiver while in `ASK_USER`.
pub struct ChannelInputSource {
    receiver: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl ChannelInputSource {
    /// Wrap the receiving half of an input channel.
    #[must_use]
    pub fn new(receiver: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            receiver: Mutex::new(receiver),
        }
    }
}

#[async_trait]
impl UserInputSource for ChannelInputSource {
    async fn request_input(&self, _question: &str) -> Option<String> {
        self.receiver.lock().await.recv().await
    }
}
