//! Prelude module - commonly used types for convenient import.

pub use crate::error::{LlmError, LlmResult};
pub use crate::openai_compat::OpenAiCompatProvider;
pub use crate::provider::{LlmProvider, ProviderConfig};
pub use crate::types::{
    LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StopReason, ToolCall,
    ToolCallResult, Usage,
};
