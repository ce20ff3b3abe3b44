//! Query Audit Sink
//!
//! Optional persistence of successful tool calls. The orchestrator
//! notifies the sink after each successful invocation; recording is
//! best-effort and never affects the user-visible turn.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipmate_core::CoreResult;
use shipmate_tools::DocumentStore;

/// Maximum stored length of a result preview.
const RESULT_PREVIEW_MAX_LEN: usize = 2000;

/// One successful tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub session_key: String,
    pub tool: String,
    pub arguments: serde_json::Value,
    /// Result text, truncated to a bounded preview
    pub result_preview: String,
}

impl AuditEntry {
    pub fn new(
        session_key: impl Into<String>,
        tool: impl Into<String>,
        arguments: serde_json::Value,
        result: &str,
    ) -> Self {
        let mut preview = result.to_string();
        if preview.len() > RESULT_PREVIEW_MAX_LEN {
            let mut end = RESULT_PREVIEW_MAX_LEN;
            while !preview.is_char_boundary(end) {
                end -= 1;
            }
            preview.truncate(end);
            preview.push_str("...");
        }

        Self {
            timestamp: Utc::now(),
            session_key: session_key.into(),
            tool: tool.into(),
            arguments,
            result_preview: preview,
        }
    }
}

/// Receives successful tool-call records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> CoreResult<()>;
}

/// Audit sink backed by the document store.
pub struct DocumentAuditSink {
    store: Arc<dyn DocumentStore>,
    container: String,
}

impl DocumentAuditSink {
    pub fn new(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

#[async_trait]
impl AuditSink for DocumentAuditSink {
    async fn record(&self, entry: AuditEntry) -> CoreResult<()> {
        let document = serde_json::to_value(&entry)?;
        self.store.upsert(&self.container, document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    struct RecordingStore {
        upserts: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn query(
            &self,
            _sql: &str,
            _cancel: CancellationToken,
        ) -> CoreResult<String> {
            Ok("[]".to_string())
        }

        async fn upsert(
            &self,
            container: &str,
            document: serde_json::Value,
        ) -> CoreResult<()> {
            self.upserts
                .lock()
                .unwrap()
                .push((container.to_string(), document));
            Ok(())
        }
    }

    #[test]
    fn test_entry_preview_is_bounded() {
        let long_result = "r".repeat(10_000);
        let entry = AuditEntry::new("alice", "run_query", serde_json::json!({}), &long_result);
        assert!(entry.result_preview.len() <= RESULT_PREVIEW_MAX_LEN + 3);
        assert!(entry.result_preview.ends_with("..."));
    }

    #[test]
    fn test_short_result_is_kept_verbatim() {
        let entry = AuditEntry::new("alice", "run_query", serde_json::json!({}), "3 rows");
        assert_eq!(entry.result_preview, "3 rows");
    }

    #[tokio::test]
    async fn test_document_sink_upserts_entry() {
        let store = Arc::new(RecordingStore {
            upserts: Mutex::new(Vec::new()),
        });
        let sink = DocumentAuditSink::new(store.clone(), "query-audit");

        let entry = AuditEntry::new(
            "alice",
            "get_build_info",
            serde_json::json!({"org": "contoso"}),
            "[]",
        );
        sink.record(entry).await.unwrap();

        let upserts = store.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].0, "query-audit");
        assert_eq!(upserts[0].1["tool"], "get_build_info");
        assert_eq!(upserts[0].1["session_key"], "alice");
    }
}
