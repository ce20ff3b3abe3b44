//! Chat Backend Trait
//!
//! Defines the common interface the dialogue orchestrator uses to talk
//! to a chat-completion API.

use async_trait::async_trait;

use super::types::{LlmError, LlmResponse, LlmResult, Message, ToolDefinition};

/// Trait that all chat backends must implement.
///
/// The orchestrator sends the full conversation history plus the tool
/// catalog and receives either final text or tool-call requests. This is
/// the one necessarily long-latency external call in the system; callers
/// await it without blocking other sessions.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the backend name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model/deployment being used.
    fn model(&self) -> &str;

    /// Returns whether this backend supports tool calling.
    fn supports_tools(&self) -> bool {
        true
    }

    /// Send the conversation and get a complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `tools` - Available tools for the model to use
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
    ) -> LlmResult<LlmResponse>;

    /// Check if the backend is healthy and reachable.
    async fn health_check(&self) -> LlmResult<()>;
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(backend: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", backend),
    }
}

/// Helper function to map HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, backend: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", backend),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", backend),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
