//! Shipmate Core
//!
//! Foundational types shared across the Shipmate workspace: the error
//! taxonomy and the conversation primitives (turns, sessions). Kept
//! dependency-light so every other crate can build on it.

pub mod conversation;
pub mod error;

pub use conversation::{ConversationSession, Role, Turn, SESSION_GREETING};
pub use error::{CoreError, CoreResult};
