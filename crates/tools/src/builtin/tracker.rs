//! Issue Tracker Tools
//!
//! Work-item creation through the `WorkItemClient` collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shipmate_llm::types::ParameterSchema;

use crate::backends::{WorkItemClient, WorkItemRequest};
use crate::builtin::{optional_str, required_str};
use crate::context::ToolInvocationContext;
use crate::trait_def::{Tool, ToolResult};

/// Creates a work item in the issue tracker.
pub struct CreateWorkItemTool {
    client: Arc<dyn WorkItemClient>,
}

impl CreateWorkItemTool {
    pub fn new(client: Arc<dyn WorkItemClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateWorkItemTool {
    fn name(&self) -> &str {
        "create_work_item"
    }

    fn description(&self) -> &str {
        "Creates a work item in the issue tracker (e.g. a Bug, Task, or \
         User Story). Returns the created item."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert(
            "item_type".to_string(),
            ParameterSchema::string(Some(
                "The type of work item to create (e.g. 'Bug', 'Task', 'User Story')",
            )),
        );
        props.insert(
            "title".to_string(),
            ParameterSchema::string(Some("The title of the work item")),
        );
        props.insert(
            "description".to_string(),
            ParameterSchema::string(Some("The description of the work item")),
        );
        props.insert(
            "assigned_to".to_string(),
            ParameterSchema::string(Some(
                "Email address of the user to assign the work item to. Optional.",
            )),
        );
        props.insert(
            "tags".to_string(),
            ParameterSchema::array(
                Some("Tags to add to the work item. Optional."),
                ParameterSchema::string(None),
            ),
        );
        ParameterSchema::object(
            None,
            props,
            vec![
                "item_type".to_string(),
                "title".to_string(),
                "description".to_string(),
            ],
        )
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let item_type = match required_str(&args, "item_type") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let title = match required_str(&args, "title") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let description = match required_str(&args, "description") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let tags = args
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let request = WorkItemRequest {
            item_type: item_type.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            assigned_to: optional_str(&args, "assigned_to").map(String::from),
            tags,
        };
        tracing::debug!(tool = self.name(), item_type, title, "tool invoked");

        match self
            .client
            .create_work_item(request, ctx.cancellation_token.clone())
            .await
        {
            Ok(created) => ToolResult::ok(created),
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

    struct RecordingClient {
        seen: Mutex<Vec<WorkItemRequest>>,
    }

    impl RecordingClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WorkItemClient for RecordingClient {
        async fn create_work_item(
            &self,
            request: WorkItemRequest,
            _cancel: CancellationToken,
        ) -> CoreResult<String> {
            let id = self.seen.lock().unwrap().len() + 1;
            self.seen.lock().unwrap().push(request);
            Ok(format!("{{\"id\": {id}}}"))
        }
    }

    #[tokio::test]
    async fn test_creates_work_item() {
        let client = RecordingClient::new();
        let tool = CreateWorkItemTool::new(client.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(
                &ctx,
                serde_json::json!({
                    "item_type": "Bug",
                    "title": "Guard fires too early",
                    "description": "The byte ceiling trips on 1 MiB exactly.",
                    "assigned_to": "dev@contoso.com",
                    "tags": ["size-guard", "p1"]
                }),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.output.unwrap(), "{\"id\": 1}");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].item_type, "Bug");
        assert_eq!(seen[0].assigned_to.as_deref(), Some("dev@contoso.com"));
        assert_eq!(seen[0].tags, vec!["size-guard", "p1"]);
    }

    #[tokio::test]
    async fn test_optional_fields_default() {
        let client = RecordingClient::new();
        let tool = CreateWorkItemTool::new(client.clone());
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(
                &ctx,
                serde_json::json!({
                    "item_type": "Task",
                    "title": "t",
                    "description": "d"
                }),
            )
            .await;

        assert!(result.success);
        let seen = client.seen.lock().unwrap();
        assert!(seen[0].assigned_to.is_none());
        assert!(seen[0].tags.is_empty());
    }

    #[tokio::test]
    async fn test_missing_title_is_reported() {
        let client = RecordingClient::new();
        let tool = CreateWorkItemTool::new(client);
        let ctx = ToolInvocationContext::new("test");

        let result = tool
            .execute(
                &ctx,
                serde_json::json!({"item_type": "Bug", "description": "d"}),
            )
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("title"));
    }
}
