//! Tool Invocation Context
//!
//! Shared state handed to each tool during execution. Tools receive
//! everything through the context rather than reaching for globals.

use tokio_util::sync::CancellationToken;

/// Context provided to each tool invocation.
pub struct ToolInvocationContext {
    /// Session the invocation belongs to
    pub session_key: String,
    /// Cancellation token for cooperative cancellation of backend calls
    pub cancellation_token: CancellationToken,
}

impl ToolInvocationContext {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Context sharing an existing cancellation token.
    pub fn with_cancellation(
        session_key: impl Into<String>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            cancellation_token,
        }
    }
}
