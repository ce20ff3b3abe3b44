//! Conversation Primitives
//!
//! A `ConversationSession` owns one user's running message history as an
//! append-only sequence of `Turn`s. Appends are atomic with respect to
//! concurrent readers of `history()` — a reader never observes a
//! partially-appended turn. The sequence is never reordered or truncated;
//! unbounded growth over a long-lived session is a known limitation.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Greeting every new session starts with.
pub const SESSION_GREETING: &str = "How can I assist you today?";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level turns (the initial greeting)
    System,
    User,
    Assistant,
    /// Result of a tool invocation requested by the model
    Tool,
}

/// One message unit in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    /// Name of the tool that produced this turn (`Tool` role only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, tool_name: Option<String>, content: String) -> Self {
        Self {
            role,
            tool_name,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// The ordered history of turns for one user/connection.
///
/// Created with a single system greeting turn. All mutation is
/// append-only; `history()` returns a point-in-time snapshot.
#[derive(Debug)]
pub struct ConversationSession {
    session_key: String,
    created_at: DateTime<Utc>,
    turns: RwLock<Vec<Turn>>,
}

impl ConversationSession {
    /// Create a session seeded with the system greeting.
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            created_at: Utc::now(),
            turns: RwLock::new(vec![Turn::new(
                Role::System,
                None,
                SESSION_GREETING.to_string(),
            )]),
        }
    }

    /// Opaque user/connection identifier this session belongs to.
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a user turn.
    pub fn append_user(&self, text: impl Into<String>) {
        self.append(Turn::new(Role::User, None, text.into()));
    }

    /// Append an assistant turn.
    pub fn append_assistant(&self, text: impl Into<String>) {
        self.append(Turn::new(Role::Assistant, None, text.into()));
    }

    /// Append a tool-result turn.
    pub fn append_tool(&self, tool_name: impl Into<String>, text: impl Into<String>) {
        self.append(Turn::new(
            Role::Tool,
            Some(tool_name.into()),
            text.into(),
        ));
    }

    /// Snapshot of the full history in conversational order.
    pub fn history(&self) -> Vec<Turn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of turns, greeting included.
    pub fn len(&self) -> usize {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&self, turn: Turn) {
        self.turns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(turn);
    }
}
