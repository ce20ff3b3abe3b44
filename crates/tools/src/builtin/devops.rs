//! DevOps Lookup Tools
//!
//! Build-centric lookups over the devops analytics cluster: build info,
//! work items, commits, and the pull requests linked to a build.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shipmate_llm::types::ParameterSchema;

use crate::backends::{QueryExecutor, QueryOptions};
use crate::builtin::required_str;
use crate::context::ToolInvocationContext;
use crate::trait_def::{Tool, ToolResult};

/// Cluster every devops lookup targets.
const DEVOPS_CLUSTER: &str = "devops";

/// Escape single quotes in a query string literal.
fn escape_literal(input: &str) -> String {
    input.replace('\'', "''")
}

fn org_build_schema() -> ParameterSchema {
    let mut props = HashMap::new();
    props.insert(
        "org".to_string(),
        ParameterSchema::string(Some("The name of the organization (e.g. 'contoso')")),
    );
    props.insert(
        "build_id".to_string(),
        ParameterSchema::string(Some("The build id to look up")),
    );
    ParameterSchema::object(None, props, vec!["org".to_string(), "build_id".to_string()])
}

/// Run a table lookup filtered by organization and build id.
async fn lookup_by_org_and_build(
    queries: &dyn QueryExecutor,
    ctx: &ToolInvocationContext,
    table: &str,
    org: &str,
    build_id: &str,
    empty_message: &str,
) -> ToolResult {
    let query = format!(
        "{table}\n| where BuildId == '{}' and OrganizationName == '{}'",
        escape_literal(build_id),
        escape_literal(org),
    );

    match queries
        .execute_query(
            DEVOPS_CLUSTER,
            &query,
            QueryOptions::default(),
            ctx.cancellation_token.clone(),
        )
        .await
    {
        Ok(result) if result.is_empty() || result == "[]" => ToolResult::ok(format!(
            "{empty_message} for Org: {org} and BuildId: {build_id}"
        )),
        Ok(result) => ToolResult::ok(result),
        Err(e) => ToolResult::err(e.to_string()),
    }
}

macro_rules! org_build_args {
    ($args:expr) => {{
        let org = match required_str(&$args, "org") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let build_id = match required_str(&$args, "build_id") {
            Ok(v) => v,
            Err(e) => return e,
        };
        (org, build_id)
    }};
}

/// Retrieves build information by organization name and build id.
pub struct GetBuildInfoTool {
    queries: Arc<dyn QueryExecutor>,
}

impl GetBuildInfoTool {
    pub fn new(queries: Arc<dyn QueryExecutor>) -> Self {
        Self { queries }
    }
}

#[async_trait]
impl Tool for GetBuildInfoTool {
    fn name(&self) -> &str {
        "get_build_info"
    }

    fn description(&self) -> &str {
        "Retrieves build information by organization name and build id."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        org_build_schema()
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let (org, build_id) = org_build_args!(args);
        tracing::debug!(tool = self.name(), org, build_id, "tool invoked");
        lookup_by_org_and_build(
            self.queries.as_ref(),
            ctx,
            "Build",
            org,
            build_id,
            "No build found",
        )
        .await
    }
}

/// Retrieves work items linked to a specific build.
pub struct GetWorkItemsByBuildTool {
    queries: Arc<dyn QueryExecutor>,
}

impl GetWorkItemsByBuildTool {
    pub fn new(queries: Arc<dyn QueryExecutor>) -> Self {
        Self { queries }
    }
}

#[async_trait]
impl Tool for GetWorkItemsByBuildTool {
    fn name(&self) -> &str {
        "get_work_items_by_build"
    }

    fn description(&self) -> &str {
        "Retrieves work items linked to a specific build."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        org_build_schema()
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let (org, build_id) = org_build_args!(args);
        tracing::debug!(tool = self.name(), org, build_id, "tool invoked");
        lookup_by_org_and_build(
            self.queries.as_ref(),
            ctx,
            "BuildWorkItem",
            org,
            build_id,
            "No work items found",
        )
        .await
    }
}

/// Retrieves commits linked to a specific build.
pub struct GetCommitsByBuildTool {
    queries: Arc<dyn QueryExecutor>,
}

impl GetCommitsByBuildTool {
    pub fn new(queries: Arc<dyn QueryExecutor>) -> Self {
        Self { queries }
    }
}

#[async_trait]
impl Tool for GetCommitsByBuildTool {
    fn name(&self) -> &str {
        "get_commits_by_build"
    }

    fn description(&self) -> &str {
        "Retrieves commits linked to a specific build."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        org_build_schema()
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let (org, build_id) = org_build_args!(args);
        tracing::debug!(tool = self.name(), org, build_id, "tool invoked");
        lookup_by_org_and_build(
            self.queries.as_ref(),
            ctx,
            "BuildChange",
            org,
            build_id,
            "No commits found",
        )
        .await
    }
}

/// Retrieves pull requests linked to a build by joining build changes
/// against pull requests.
pub struct GetPullRequestsByBuildTool {
    queries: Arc<dyn QueryExecutor>,
}

impl GetPullRequestsByBuildTool {
    pub fn new(queries: Arc<dyn QueryExecutor>) -> Self {
        Self { queries }
    }
}

#[async_trait]
impl Tool for GetPullRequestsByBuildTool {
    fn name(&self) -> &str {
        "get_pull_requests_by_build"
    }

    fn description(&self) -> &str {
        "Retrieves pull requests linked to a specific build by joining \
         build changes against pull requests."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        org_build_schema()
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let (org, build_id) = org_build_args!(args);
        tracing::debug!(tool = self.name(), org, build_id, "tool invoked");

        let query = format!(
            "BuildChange\n\
             | where BuildId == '{}' and OrganizationName == '{}'\n\
             | join kind=inner PullRequest on $left.BuildChangeId == $right.LastMergeSourceCommitId\n\
             | project PullRequestId, Title, Status, CreatedDate, UpdatedDate",
            escape_literal(build_id),
            escape_literal(org),
        );

        match self
            .queries
            .execute_query(
                DEVOPS_CLUSTER,
                &query,
                QueryOptions::default(),
                ctx.cancellation_token.clone(),
            )
            .await
        {
            Ok(result) if result.is_empty() || result == "[]" => ToolResult::ok(format!(
                "No pull requests found for Org: {org} and BuildId: {build_id}"
            )),
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipmate_core::CoreResult;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Records the queries it receives and replays a canned answer.
    struct RecordingQueries {
        seen: Mutex<Vec<String>>,
        answer: String,
    }

    impl RecordingQueries {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                answer: answer.to_string(),
            })
        }

        fn last_query(&self) -> String {
            self.seen.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl QueryExecutor for RecordingQueries {
        async fn execute_query(
            &self,
            cluster_key: &str,
            query: &str,
            _options: QueryOptions,
            _cancel: CancellationToken,
        ) -> CoreResult<String> {
            assert_eq!(cluster_key, DEVOPS_CLUSTER);
            self.seen.lock().unwrap().push(query.to_string());
            Ok(self.answer.clone())
        }

        async fn execute_admin_command(
            &self,
            _cluster_key: &str,
            _command: &str,
            _cancel: CancellationToken,
        ) -> CoreResult<String> {
            unreachable!("devops tools never issue admin commands")
        }
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("o'brien"), "o''brien");
        assert_eq!(escape_literal("plain"), "plain");
    }

    #[tokio::test]
    async fn test_build_info_query_shape() {
        let queries = RecordingQueries::new("[{\"BuildId\":\"42\"}]");
        let tool = GetBuildInfoTool::new(queries.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(&ctx, serde_json::json!({"org": "contoso", "build_id": "42"}))
            .await;
        assert!(result.success);

        let query = queries.last_query();
        assert!(query.starts_with("Build\n"));
        assert!(query.contains("BuildId == '42'"));
        assert!(query.contains("OrganizationName == 'contoso'"));
    }

    #[tokio::test]
    async fn test_build_info_escapes_quotes() {
        let queries = RecordingQueries::new("[]");
        let tool = GetBuildInfoTool::new(queries.clone());
        let ctx = ToolInvocationContext::new("test");

        tool.execute(
            &ctx,
            serde_json::json!({"org": "o'brien", "build_id": "42"}),
        )
        .await;
        assert!(queries.last_query().contains("'o''brien'"));
    }

    #[tokio::test]
    async fn test_empty_result_becomes_message() {
        let queries = RecordingQueries::new("[]");
        let tool = GetWorkItemsByBuildTool::new(queries);
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(&ctx, serde_json::json!({"org": "contoso", "build_id": "42"}))
            .await;
        assert!(result.success);
        assert_eq!(
            result.output.unwrap(),
            "No work items found for Org: contoso and BuildId: 42"
        );
    }

    #[tokio::test]
    async fn test_pull_requests_join_query() {
        let queries = RecordingQueries::new("[{\"PullRequestId\": 7}]");
        let tool = GetPullRequestsByBuildTool::new(queries.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(&ctx, serde_json::json!({"org": "contoso", "build_id": "42"}))
            .await;
        assert!(result.success);

        let query = queries.last_query();
        assert!(query.contains("join kind=inner PullRequest"));
        assert!(query.contains("project PullRequestId, Title, Status"));
    }

    #[tokio::test]
    async fn test_missing_org_is_reported() {
        let queries = RecordingQueries::new("[]");
        let tool = GetBuildInfoTool::new(queries);
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(&ctx, serde_json::json!({"build_id": "42"}))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("org"));
    }
}
