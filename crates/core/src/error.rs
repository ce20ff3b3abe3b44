//! Core Error Types
//!
//! Defines the foundational error types used across the Shipmate
//! workspace. Tool- and model-level failures are recovered inside the
//! dialogue orchestrator and converted to user-visible text; only
//! configuration-time errors (duplicate tool names, malformed config)
//! are meant to be fatal at startup.

use thiserror::Error;

/// Core error type for the Shipmate workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (bad caller input, e.g. an empty session key)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A tool was registered under a name that already exists
    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    /// A tool was invoked by a name that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool ran and failed; wraps the underlying cause as text
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// A query targeted a cluster key that is not in the catalog
    #[error("Unknown cluster key: {0}")]
    UnknownCluster(String),

    /// The in-flight operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a duplicate-tool error
    pub fn duplicate_tool(name: impl Into<String>) -> Self {
        Self::DuplicateTool(name.into())
    }

    /// Create an unknown-tool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    /// Create a tool-execution error wrapping the underlying cause
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-cluster error
    pub fn unknown_cluster(key: impl Into<String>) -> Self {
        Self::UnknownCluster(key.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
