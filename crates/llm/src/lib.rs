//! Shipmate LLM
//!
//! Chat-backend abstraction: the message and tool-definition types
//! exchanged with a chat-completion API, the `ChatBackend` trait, and an
//! Azure-OpenAI-compatible HTTP provider.

pub mod azure;
pub mod provider;
pub mod types;

pub use azure::{AzureOpenAIProvider, BackendConfig};
pub use provider::ChatBackend;
pub use types::{
    LlmError, LlmResponse, LlmResult, Message, MessageContent, MessageRole, ParameterSchema,
    StopReason, ToolCall, ToolDefinition, UsageStats,
};
