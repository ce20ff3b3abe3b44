//! Document Store Tools
//!
//! Queries over the document database, plus the feedback recorder that
//! files user feedback, bug reports, internal errors, and improvement
//! ideas into the feedback container.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use shipmate_llm::types::ParameterSchema;

use crate::backends::DocumentStore;
use crate::builtin::required_str;
use crate::context::ToolInvocationContext;
use crate::trait_def::{Tool, ToolResult};

/// Container feedback entries are filed into.
const FEEDBACK_CONTAINER: &str = "feedback";

const FEEDBACK_CATEGORIES: &[&str] = &["feedback", "bug", "error", "improvement"];

/// Queries the document database with a SQL query.
pub struct QueryDocumentsTool {
    store: Arc<dyn DocumentStore>,
}

impl QueryDocumentsTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for QueryDocumentsTool {
    fn name(&self) -> &str {
        "query_documents"
    }

    fn description(&self) -> &str {
        "Queries the document database for items based on a SQL query."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert(
            "sql".to_string(),
            ParameterSchema::string(Some("The SQL query to execute")),
        );
        ParameterSchema::object(None, props, vec!["sql".to_string()])
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let sql = match required_str(&args, "sql") {
            Ok(v) => v,
            Err(e) => return e,
        };
        tracing::debug!(tool = self.name(), "tool invoked");

        match self.store.query(sql, ctx.cancellation_token.clone()).await {
            Ok(result) => ToolResult::ok(result),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

/// Records feedback, bug reports, errors, and improvement ideas.
pub struct RecordFeedbackTool {
    store: Arc<dyn DocumentStore>,
}

impl RecordFeedbackTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecordFeedbackTool {
    fn name(&self) -> &str {
        "record_feedback"
    }

    fn description(&self) -> &str {
        "Records user feedback, a bug report, an internal error, or an \
         improvement idea. Consider saving feedback whenever the user \
         reports something notable about the assistant's behavior."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut props = HashMap::new();
        props.insert(
            "category".to_string(),
            ParameterSchema::string_enum(
                Some("What kind of entry this is"),
                FEEDBACK_CATEGORIES,
            ),
        );
        props.insert(
            "content".to_string(),
            ParameterSchema::string(Some("The entry content")),
        );
        ParameterSchema::object(
            None,
            props,
            vec!["category".to_string(), "content".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        let category = match required_str(&args, "category") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let content = match required_str(&args, "content") {
            Ok(v) => v,
            Err(e) => return e,
        };
        if !FEEDBACK_CATEGORIES.contains(&category) {
            return ToolResult::err(format!(
                "Unknown category '{category}'. Valid categories: {}.",
                FEEDBACK_CATEGORIES.join(", ")
            ));
        }
        tracing::debug!(tool = self.name(), category, "tool invoked");

        let timestamp = Utc::now();
        let document = serde_json::json!({
            "timestamp": timestamp.to_rfc3339(),
            "session_key": ctx.session_key,
            "category": category,
            "content": content,
        });

        match self.store.upsert(FEEDBACK_CONTAINER, document).await {
            Ok(()) => ToolResult::ok(format!(
                "{category} entry saved successfully at {}.",
                timestamp.to_rfc3339()
            )),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}
