//! Session Store
//!
//! Maps opaque session keys to their conversation sessions. Sessions
//! are created lazily and live for the process lifetime — there is no
//! eviction, which is a documented limitation rather than an oversight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use shipmate_core::{ConversationSession, CoreError, CoreResult};

/// One session plus its turn gate.
///
/// The gate serializes whole `respond` turns for the session: two
/// concurrent calls for the same key never interleave their tool-call
/// loops or history appends. Independent sessions never contend on it.
#[derive(Debug)]
pub struct SessionHandle {
    pub session: ConversationSession,
    pub turn_gate: Mutex<()>,
}

impl SessionHandle {
    fn new(session_key: &str) -> Self {
        Self {
            session: ConversationSession::new(session_key),
            turn_gate: Mutex::new(()),
        }
    }
}

/// Concurrent-safe registry of sessions keyed by session key.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Get the session for a key, creating it on first use.
    ///
    /// Concurrent calls with the same key return the same handle; the
    /// map's entry lock guarantees single creation under race. An empty
    /// key is a usage error reported to the caller.
    pub fn get_or_create(&self, session_key: &str) -> CoreResult<Arc<SessionHandle>> {
        if session_key.trim().is_empty() {
            return Err(CoreError::validation("session key must not be empty"));
        }

        Ok(self
            .sessions
            .entry(session_key.to_string())
            .or_insert_with(|| Arc::new(SessionHandle::new(session_key)))
            .value()
            .clone())
    }

    /// Look up an existing session without creating one.
    pub fn get(&self, session_key: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_key).map(|e| e.value().clone())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        assert!(store.get("alice").is_none());

        let handle = store.get_or_create("alice").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(handle.session.session_key(), "alice");
        assert!(store.get("alice").is_some());
    }

    #[test]
    fn test_same_key_returns_same_session() {
        let store = SessionStore::new();
        let a = store.get_or_create("alice").unwrap();
        let b = store.get_or_create("alice").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_sessions() {
        let store = SessionStore::new();
        let alice = store.get_or_create("alice").unwrap();
        let bob = store.get_or_create("bob").unwrap();
        assert!(!Arc::ptr_eq(&alice, &bob));

        alice.session.append_user("from alice");
        assert_eq!(alice.session.len(), 2);
        assert_eq!(bob.session.len(), 1);
    }

    #[test]
    fn test_empty_key_is_a_usage_error() {
        let store = SessionStore::new();
        assert!(matches!(
            store.get_or_create("").unwrap_err(),
            CoreError::Validation(_)
        ));
        assert!(matches!(
            store.get_or_create("   ").unwrap_err(),
            CoreError::Validation(_)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_no_duplicate_creation_under_race() {
        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.get_or_create("shared").unwrap()
            }));
        }

        let sessions: Vec<Arc<SessionHandle>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(store.len(), 1);
        for session in &sessions[1..] {
            assert!(Arc::ptr_eq(&sessions[0], session));
        }
    }
}
