//! Colloquy LLM - completion provider abstraction.
//!
//! The orchestration engine consumes the language model through the
//! [`LlmProvider`] trait: messages and tool schemas in, a complete
//! response (text or tool calls) out. Responses are buffered rather than
//! streamed — the output-side moderation gate must resolve before any
//! content reaches the user, so there is nothing to stream to.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod openai_compat;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{LlmProvider, ProviderConfig};
pub use types::{
    LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StopReason, ToolCall,
    ToolCallResult, Usage,
};
