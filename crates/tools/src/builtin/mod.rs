//! Built-in Tools
//!
//! The static tool catalog. Every tool here is constructed by an
//! explicit factory from its collaborators and registered at startup —
//! there is no runtime discovery.

pub mod devops;
pub mod documents;
pub mod telemetry;
pub mod tracker;

use std::sync::Arc;

use serde_json::Value;

use crate::backends::{DocumentStore, QueryExecutor, WorkItemClient};
use crate::clusters::ClusterCatalog;
use crate::trait_def::{Tool, ToolResult};

/// Collaborators the built-in tools are wired with.
#[derive(Clone)]
pub struct BuiltinToolDeps {
    pub catalog: Arc<ClusterCatalog>,
    pub queries: Arc<dyn QueryExecutor>,
    pub documents: Arc<dyn DocumentStore>,
    pub work_items: Arc<dyn WorkItemClient>,
}

/// Build the full built-in tool set in its canonical order.
pub fn builtin_tools(deps: &BuiltinToolDeps) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(telemetry::ListClustersTool::new(deps.catalog.clone())),
        Arc::new(telemetry::ListTablesTool::new(
            deps.catalog.clone(),
            deps.queries.clone(),
        )),
        Arc::new(telemetry::RunQueryTool::new(
            deps.catalog.clone(),
            deps.queries.clone(),
        )),
        Arc::new(telemetry::RunQueryPagedTool::new(
            deps.catalog.clone(),
            deps.queries.clone(),
        )),
        Arc::new(telemetry::RunQueryAllPagesTool::new(
            deps.catalog.clone(),
            deps.queries.clone(),
        )),
        Arc::new(telemetry::QueryRowCountTool::new(
            deps.catalog.clone(),
            deps.queries.clone(),
        )),
        Arc::new(telemetry::query_best_practices_tool()),
        Arc::new(devops::GetBuildInfoTool::new(deps.queries.clone())),
        Arc::new(devops::GetWorkItemsByBuildTool::new(deps.queries.clone())),
        Arc::new(devops::GetCommitsByBuildTool::new(deps.queries.clone())),
        Arc::new(devops::GetPullRequestsByBuildTool::new(deps.queries.clone())),
        Arc::new(tracker::CreateWorkItemTool::new(deps.work_items.clone())),
        Arc::new(documents::QueryDocumentsTool::new(deps.documents.clone())),
        Arc::new(documents::RecordFeedbackTool::new(deps.documents.clone())),
    ]
}

/// Pull a required string argument, or produce the error result the
/// model needs to correct itself.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolResult> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolResult::err(format!("Missing required parameter: {key}")))
}

/// Pull an optional string argument.
pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// Pull an optional non-negative integer argument with a default.
pub(crate) fn optional_usize(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}


#[cfg(test)]
mod tests {
    use super::test_support::null_deps;
    use super::*;
    use crate::trait_def::ToolRegistry;

    #[test]
    fn test_builtin_tool_names_are_unique() {
        let tools = builtin_tools(&null_deps());
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_builtin_tools_register_cleanly() {
        let mut registry = ToolRegistry::new();
        registry.register_all(builtin_tools(&null_deps())).unwrap();
        assert_eq!(registry.len(), 14);

        for name in [
            "list_clusters",
            "list_tables",
            "run_query",
            "run_query_paged",
            "run_query_all_pages",
            "query_row_count",
            "query_best_practices",
            "get_build_info",
            "get_work_items_by_build",
            "get_commits_by_build",
            "get_pull_requests_by_build",
            "create_work_item",
            "query_documents",
            "record_feedback",
        ] {
            assert!(registry.contains(name), "missing builtin tool '{name}'");
        }
    }

    #[test]
    fn test_every_builtin_has_help() {
        let tools = builtin_tools(&null_deps());
        for tool in &tools {
            let help = tool.help().unwrap();
            assert_eq!(help["name"], tool.name());
            assert!(help["parameters"].is_object());
        }
    }

    #[test]
    fn test_required_str() {
        let args = serde_json::json!({"cluster": "devops", "blank": "  "});
        assert_eq!(required_str(&args, "cluster").unwrap(), "devops");
        assert!(required_str(&args, "missing").is_err());
        assert!(required_str(&args, "blank").is_err());
    }

    #[test]
    fn test_optional_usize() {
        let args = serde_json::json!({"page_size": 100});
        assert_eq!(optional_usize(&args, "page_size", 500), 100);
        assert_eq!(optional_usize(&args, "page_index", 0), 0);
    }
}
