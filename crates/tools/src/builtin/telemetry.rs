//! Telemetry Query Tools
//!
//! Tools over the analytics query backend: cluster discovery, schema
//! listing, query execution (plain, windowed, exhaustive), and the
//! count-only probe the size-guard guidance points the model at.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shipmate_llm::types::ParameterSchema;

use crate::backends::{QueryExecutor, QueryOptions, DEFAULT_PAGE_SIZE};
use crate::builtin::{optional_str, optional_usize, required_str};
use crate::clusters::ClusterCatalog;
use crate::context::ToolInvocationContext;
use crate::paging;
use crate::size_guard::ChunkPolicy;
use crate::trait_def::{FunctionTool, Tool, ToolResult};

fn cluster_param() -> ParameterSchema {
    ParameterSchema::string(Some(
        "Key of the cluster to query (see list_clusters for valid keys)",
    ))
}

fn query_param() -> ParameterSchema {
    ParameterSchema::string(Some("The query string to execute"))
}

/// Lists the available clusters and their databases.
pub struct ListClustersTool {
    catalog: Arc<ClusterCatalog>,
}

impl ListClustersTool {
    pub fn new(catalog: Arc<ClusterCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for ListClustersTool {
    fn name(&self) -> &str {
        "list_clusters"
    }

    fn description(&self) -> &str {
        "Lists the available analytics clusters and their databases with descriptions."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::object(None, HashMap::new(), vec![])
    }

    async fn execute(&self, _ctx: &ToolInvocationContext, _args: Value) -> ToolResult {
        tracing::debug!(tool = self.name(), "tool invoked");
        ToolResult::ok(self.catalog.describe())
    }
}

/// Lists the tables in a cluster's database via a schema command.
pub struct ListTablesTool {
    catalog: Arc<ClusterCatalog>,
    queries: Arc<dyn QueryExecutor>,
}

impl ListTablesTool {
    pub fn new(catalog: Arc<ClusterCatalog>, queries: Arc<dyn QueryExecutor>) -> Self {
        Self { catalog, queries }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        "list_tables"
    }

    fn description(&self) -> &str {
        "Lists all the tables in the specified cluster's database."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert("cluster".to_string(), cluster_param());
        ParameterSchema::object(None, props, vec!["cluster".to_string()])
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let cluster_key = match required_str(&args, "cluster") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let cluster = match self.catalog.get(cluster_key) {
            Ok(c) => c,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        tracing::debug!(tool = self.name(), cluster = cluster_key, "tool invoked");

        let command = format!(".show database {} cslschema", cluster.database);
        match self
            .queries
            .execute_admin_command(cluster_key, &command, ctx.cancellation_token.clone())
            .await
        {
            Ok(result) if result.is_empty() => ToolResult::ok("No tables found."),
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

/// Executes a query against a cluster.
pub struct RunQueryTool {
    catalog: Arc<ClusterCatalog>,
    queries: Arc<dyn QueryExecutor>,
}

impl RunQueryTool {
    pub fn new(catalog: Arc<ClusterCatalog>, queries: Arc<dyn QueryExecutor>) -> Self {
        Self { catalog, queries }
    }
}

#[async_trait]
impl Tool for RunQueryTool {
    fn name(&self) -> &str {
        "run_query"
    }

    fn description(&self) -> &str {
        "Executes a query against the specified cluster's database. \
         Run query_best_practices first when composing a new query."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert("cluster".to_string(), cluster_param());
        props.insert("query".to_string(), query_param());
        ParameterSchema::object(
            None,
            props,
            vec!["cluster".to_string(), "query".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let cluster_key = match required_str(&args, "cluster") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let query = match required_str(&args, "query") {
            Ok(v) => v,
            Err(e) => return e,
        };
        if let Err(e) = self.catalog.get(cluster_key) {
            return ToolResult::err(e.to_string());
        }
        tracing::debug!(tool = self.name(), cluster = cluster_key, "tool invoked");

        match self
            .queries
            .execute_query(
                cluster_key,
                query,
                QueryOptions::default(),
                ctx.cancellation_token.clone(),
            )
            .await
        {
            Ok(result) if result.is_empty() => ToolResult::ok("No results found."),
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

/// Executes a query windowed to one page of rows.
pub struct RunQueryPagedTool {
    catalog: Arc<ClusterCatalog>,
    queries: Arc<dyn QueryExecutor>,
}

impl RunQueryPagedTool {
    pub fn new(catalog: Arc<ClusterCatalog>, queries: Arc<dyn QueryExecutor>) -> Self {
        Self { catalog, queries }
    }
}

#[async_trait]
impl Tool for RunQueryPagedTool {
    fn name(&self) -> &str {
        "run_query_paged"
    }

    fn description(&self) -> &str {
        "Executes a query returning one page of rows. Use for results too \
         large to fetch in one call; increment page_index to walk the pages."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert("cluster".to_string(), cluster_param());
        props.insert("query".to_string(), query_param());
        props.insert(
            "page_size".to_string(),
            ParameterSchema::integer(Some("Rows per page (default 500)")),
        );
        props.insert(
            "page_index".to_string(),
            ParameterSchema::integer(Some("Zero-based page to fetch (default 0)")),
        );
        ParameterSchema::object(
            None,
            props,
            vec!["cluster".to_string(), "query".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let cluster_key = match required_str(&args, "cluster") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let query = match required_str(&args, "query") {
            Ok(v) => v,
            Err(e) => return e,
        };
        if let Err(e) = self.catalog.get(cluster_key) {
            return ToolResult::err(e.to_string());
        }
        let page_size = optional_usize(&args, "page_size", DEFAULT_PAGE_SIZE);
        let page_index = optional_usize(&args, "page_index", 0);
        tracing::debug!(
            tool = self.name(),
            cluster = cluster_key,
            page_size,
            page_index,
            "tool invoked"
        );

        match self
            .queries
            .execute_query(
                cluster_key,
                query,
                QueryOptions::page(page_size, page_index),
                ctx.cancellation_token.clone(),
            )
            .await
        {
            Ok(result) if result.is_empty() => ToolResult::ok("No results found."),
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

/// Collects every page of a query under an explicit chunk policy.
pub struct RunQueryAllPagesTool {
    catalog: Arc<ClusterCatalog>,
    queries: Arc<dyn QueryExecutor>,
}

impl RunQueryAllPagesTool {
    pub fn new(catalog: Arc<ClusterCatalog>, queries: Arc<dyn QueryExecutor>) -> Self {
        Self { catalog, queries }
    }
}

#[async_trait]
impl Tool for RunQueryAllPagesTool {
    fn name(&self) -> &str {
        "run_query_all_pages"
    }

    fn description(&self) -> &str {
        "Fetches a query page by page and returns the combined result. The \
         policy parameter decides what happens when the output grows past \
         the context budget: first_chunk keeps what fits, all_chunks keeps \
         everything, discard drops the result."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert("cluster".to_string(), cluster_param());
        props.insert("query".to_string(), query_param());
        props.insert(
            "page_size".to_string(),
            ParameterSchema::integer(Some("Rows per page (default 500)")),
        );
        props.insert(
            "policy".to_string(),
            ParameterSchema::string_enum(
                Some("Oversize handling policy (default first_chunk)"),
                &["first_chunk", "all_chunks", "discard"],
            ),
        );
        ParameterSchema::object(
            None,
            props,
            vec!["cluster".to_string(), "query".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let cluster_key = match required_str(&args, "cluster") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let query = match required_str(&args, "query") {
            Ok(v) => v,
            Err(e) => return e,
        };
        if let Err(e) = self.catalog.get(cluster_key) {
            return ToolResult::err(e.to_string());
        }
        let page_size = optional_usize(&args, "page_size", DEFAULT_PAGE_SIZE);
        let policy = match optional_str(&args, "policy")
            .unwrap_or("first_chunk")
            .parse::<ChunkPolicy>()
        {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        tracing::debug!(tool = self.name(), cluster = cluster_key, "tool invoked");

        match paging::collect_paged(
            self.queries.as_ref(),
            cluster_key,
            query,
            page_size,
            policy,
            ctx.cancellation_token.clone(),
        )
        .await
        {
            Ok(result) if result.is_empty() => ToolResult::ok("No results found."),
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

/// Count-only probe for a query's result size.
pub struct QueryRowCountTool {
    catalog: Arc<ClusterCatalog>,
    queries: Arc<dyn QueryExecutor>,
}

impl QueryRowCountTool {
    pub fn new(catalog: Arc<ClusterCatalog>, queries: Arc<dyn QueryExecutor>) -> Self {
        Self { catalog, queries }
    }
}

#[async_trait]
impl Tool for QueryRowCountTool {
    fn name(&self) -> &str {
        "query_row_count"
    }

    fn description(&self) -> &str {
        "Returns only the number of rows a query would produce. Cheap way \
         to check a result's size before fetching it."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert("cluster".to_string(), cluster_param());
        props.insert("query".to_string(), query_param());
        ParameterSchema::object(
            None,
            props,
            vec!["cluster".to_string(), "query".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let cluster_key = match required_str(&args, "cluster") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let query = match required_str(&args, "query") {
            Ok(v) => v,
            Err(e) => return e,
        };
        if let Err(e) = self.catalog.get(cluster_key) {
            return ToolResult::err(e.to_string());
        }
        tracing::debug!(tool = self.name(), cluster = cluster_key, "tool invoked");

        let count_query = format!("{} | count", query.trim_end());
        match self
            .queries
            .execute_query(
                cluster_key,
                &count_query,
                QueryOptions::default(),
                ctx.cancellation_token.clone(),
            )
            .await
        {
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

/// Static query-writing guidance, surfaced as a tool so the model can
/// consult it before composing a query.
pub fn query_best_practices_tool() -> FunctionTool {
    FunctionTool::new(
        "query_best_practices",
        "Returns guidance to follow when writing analytics queries. \
         Consult this before composing a new query.",
        ParameterSchema::object(None, HashMap::new(), vec![]),
        |_ctx, _args| {
            Box::pin(async {
                ToolResult::ok(
                    "Best practices for analytics queries:\n\
                     1. On semantic errors ('Failed to resolve scalar expression named ...'), \
                     check that the columns exist on the table with list_tables.\n\
                     2. If a specific value is hard to find, inspect the distinct values of \
                     the column first.\n\
                     3. Probe result sizes with query_row_count before fetching large tables, \
                     and bound queries with a '| take' clause.",
                )
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::null_deps;

    #[tokio::test]
    async fn test_list_clusters_renders_catalog() {
        let deps = null_deps();
        let tool = ListClustersTool::new(deps.catalog.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool.execute(&ctx, serde_json::json!({})).await;
        assert!(result.success);
        assert!(result.output.unwrap().contains("devops"));
    }

    #[tokio::test]
    async fn test_run_query_rejects_unknown_cluster() {
        let deps = null_deps();
        let tool = RunQueryTool::new(deps.catalog.clone(), deps.queries.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(
                &ctx,
                serde_json::json!({"cluster": "nope", "query": "Build | take 1"}),
            )
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown cluster key"));
    }

    #[tokio::test]
    async fn test_run_query_requires_query_param() {
        let deps = null_deps();
        let tool = RunQueryTool::new(deps.catalog.clone(), deps.queries.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(&ctx, serde_json::json!({"cluster": "devops"}))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("query"));
    }

    #[tokio::test]
    async fn test_run_query_all_pages_rejects_bad_policy() {
        let deps = null_deps();
        let tool = RunQueryAllPagesTool::new(deps.catalog.clone(), deps.queries.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(
                &ctx,
                serde_json::json!({
                    "cluster": "devops",
                    "query": "Build",
                    "policy": "ask_the_user"
                }),
            )
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown chunk policy"));
    }

    #[tokio::test]
    async fn test_best_practices_is_static() {
        let tool = query_best_practices_tool();
        let ctx = ToolInvocationContext::new("test");
        let result = tool.execute(&ctx, serde_json::json!({})).await;
        assert!(result.success);
        assert!(result.output.unwrap().contains("query_row_count"));
    }
}
