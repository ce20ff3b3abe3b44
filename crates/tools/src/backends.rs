//! Backend Collaborator Traits
//!
//! Interfaces to the external data systems the tools talk to: the
//! analytics query engine, the document database, and the issue
//! tracker. The core never speaks a wire protocol itself — hosting
//! layers supply implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use shipmate_core::CoreResult;

/// Default page size for windowed queries.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Row-range pagination options for a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Whether to apply a row window at all
    pub paginated: bool,
    /// Rows per page
    pub page_size: usize,
    /// Zero-based page index
    pub page_index: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            paginated: false,
            page_size: DEFAULT_PAGE_SIZE,
            page_index: 0,
        }
    }
}

impl QueryOptions {
    /// A window over the given page.
    pub fn page(page_size: usize, page_index: usize) -> Self {
        Self {
            paginated: true,
            page_size,
            page_index,
        }
    }
}

/// Executes parameterized queries against a named analytics backend.
///
/// Results come back as tabular data serialized as JSON text; the core
/// assumes no further structure. Unknown cluster keys fail with
/// `CoreError::UnknownCluster`.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a query, optionally windowed to a row range.
    async fn execute_query(
        &self,
        cluster_key: &str,
        query: &str,
        options: QueryOptions,
        cancel: CancellationToken,
    ) -> CoreResult<String>;

    /// Execute an administrative command (e.g. a schema listing).
    async fn execute_admin_command(
        &self,
        cluster_key: &str,
        command: &str,
        cancel: CancellationToken,
    ) -> CoreResult<String>;
}

/// Queries and stores JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a SQL-style query and return the matching documents as JSON.
    async fn query(
        &self,
        sql: &str,
        cancel: CancellationToken,
    ) -> CoreResult<String>;

    /// Insert or update a document in the named container.
    async fn upsert(
        &self,
        container: &str,
        document: serde_json::Value,
    ) -> CoreResult<()>;
}

/// A work item to create in the issue tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemRequest {
    /// Work item type (e.g. "Bug", "Task", "User Story")
    pub item_type: String,
    pub title: String,
    pub description: String,
    /// Email address of the assignee, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Creates work items in the issue tracker.
#[async_trait]
pub trait WorkItemClient: Send + Sync {
    /// Create a work item; returns the created item serialized as JSON.
    async fn create_work_item(
        &self,
        request: WorkItemRequest,
        cancel: CancellationToken,
    ) -> CoreResult<String>;
}
