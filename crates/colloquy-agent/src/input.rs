//! User input during an agent turn.

use async_trait::async_trait;

/// Source of mid-turn user input for `ASK_USER` suspensions.
///
/// The transport layer implements this over whatever channel reaches the
/// user. Returning `None` means the user did not answer; the loop treats
/// that as an implicit cancellation of the question only.
#[async_trait]
pub trait UserInputSource: Send + Sync {
    /// Ask the user a question and wait for an answer.
    async fn request_input(&self, question: &str) -> Option<String>;
}
