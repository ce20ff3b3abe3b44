//! Offline Collaborators
//!
//! In-memory implementations of the backend collaborator traits, used
//! by the REPL when no real analytics/document/tracker backend is wired
//! up, and by the integration tests. They serve a small fixed data set
//! and honor cancellation, but persist nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use shipmate_core::{CoreError, CoreResult};
use shipmate_tools::{
    ClusterCatalog, DocumentStore, QueryExecutor, QueryOptions, WorkItemClient, WorkItemRequest,
};

/// Query executor over a fixed sample data set.
///
/// The first word of a query selects the table; row windows are applied
/// the same way a real backend would apply a skip/take suffix.
pub struct SampleQueryExecutor {
    catalog: Arc<ClusterCatalog>,
    tables: HashMap<&'static str, Vec<Value>>,
}

impl SampleQueryExecutor {
    pub fn new(catalog: Arc<ClusterCatalog>) -> Self {
        let mut tables: HashMap<&'static str, Vec<Value>> = HashMap::new();
        tables.insert(
            "Build",
            vec![json!({
                "BuildId": "20240801.1",
                "OrganizationName": "contoso",
                "Status": "succeeded",
                "Branch": "refs/heads/main",
                "QueueTime": "2026-08-01T09:14:00Z"
            })],
        );
        tables.insert(
            "BuildWorkItem",
            vec![
                json!({
                    "BuildId": "20240801.1",
                    "OrganizationName": "contoso",
                    "WorkItemId": 4711,
                    "Title": "Clamp oversized tool results"
                }),
                json!({
                    "BuildId": "20240801.1",
                    "OrganizationName": "contoso",
                    "WorkItemId": 4712,
                    "Title": "Serialize turns per session"
                }),
            ],
        );
        tables.insert(
            "BuildChange",
            vec![json!({
                "BuildId": "20240801.1",
                "OrganizationName": "contoso",
                "BuildChangeId": "c0ffee42",
                "Author": "dev@contoso.com",
                "Message": "Harden the session store"
            })],
        );
        tables.insert(
            "PullRequest",
            vec![json!({
                "PullRequestId": 314,
                "Title": "Harden the session store",
                "Status": "completed",
                "LastMergeSourceCommitId": "c0ffee42"
            })],
        );
        tables.insert(
            "DeployRequest",
            vec![json!({
                "Id": "DR-1009",
                "ServiceName": "Orchard Gateway",
                "BuildId": "20240801.1",
                "LastStatusUpdateDate": "2026-08-02T16:40:00Z",
                "Status": "Approved"
            })],
        );
        Self { catalog, tables }
    }

    fn table_for(&self, query: &str) -> Vec<Value> {
        let table = query
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches('|');
        self.tables.get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for SampleQueryExecutor {
    async fn execute_query(
        &self,
        cluster_key: &str,
        query: &str,
        options: QueryOptions,
        cancel: CancellationToken,
    ) -> CoreResult<String> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        self.catalog.get(cluster_key)?;

        let mut rows = self.table_for(query);
        if query.contains("| count") {
            return Ok(json!([{"Count": rows.len()}]).to_string());
        }
        if options.paginated {
            let start = options.page_size * options.page_index;
            rows = rows
                .into_iter()
                .skip(start)
                .take(options.page_size)
                .collect();
            if rows.is_empty() {
                return Ok(String::new());
            }
        }
        Ok(Value::Array(rows).to_string())
    }

    async fn execute_admin_command(
        &self,
        cluster_key: &str,
        _command: &str,
        cancel: CancellationToken,
    ) -> CoreResult<String> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        self.catalog.get(cluster_key)?;

        let mut names: Vec<&&str> = self.tables.keys().collect();
        names.sort();
        Ok(json!({ "tables": names }).to_string())
    }
}

/// Document store over an in-memory container map.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    containers: Mutex<HashMap<String, Vec<Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents stored in one container (test/inspection helper).
    pub fn documents(&self, container: &str) -> Vec<Value> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(container)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, _sql: &str, cancel: CancellationToken) -> CoreResult<String> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        // Sample behavior: every stored document matches.
        let containers = self
            .containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let all: Vec<Value> = containers.values().flatten().cloned().collect();
        Ok(Value::Array(all).to_string())
    }

    async fn upsert(&self, container: &str, document: Value) -> CoreResult<()> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(container.to_string())
            .or_default()
            .push(document);
        Ok(())
    }
}

/// Work-item client that assigns sequential ids in memory.
#[derive(Default)]
pub struct InMemoryWorkItemClient {
    items: Mutex<Vec<WorkItemRequest>>,
}

impl InMemoryWorkItemClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<WorkItemRequest> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WorkItemClient for InMemoryWorkItemClient {
    async fn create_work_item(
        &self,
        request: WorkItemRequest,
        cancel: CancellationToken,
    ) -> CoreResult<String> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.push(request.clone());
        let created = json!({
            "id": items.len(),
            "item_type": request.item_type,
            "title": request.title,
            "state": "New"
        });
        Ok(created.to_string())
    }
}
