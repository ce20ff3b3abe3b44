//! Chat Services
//!
//! The conversation layer: the session store, the dialogue
//! orchestrator, and the optional audit sink.

pub mod audit;
pub mod orchestrator;
pub mod store;

pub use audit::{AuditEntry, AuditSink, DocumentAuditSink};
pub use orchestrator::{DialogueOrchestrator, OrchestratorConfig};
pub use store::{SessionHandle, SessionStore};
