//! Tool Trait and Registry
//!
//! Defines the unified `Tool` trait interface and `ToolRegistry` for
//! tool registration, lookup, dispatch, and aggregated help generation.
//! Tools are plain capability records (name, description, schema,
//! execution) — shared behavior lives in free functions, not a base
//! type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use shipmate_core::{CoreError, CoreResult};
use shipmate_llm::types::{ParameterSchema, ToolDefinition};

use crate::context::ToolInvocationContext;

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Convert to string for model consumption
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}

/// Unified tool interface.
///
/// Each tool provides identity (name, description, parameter schema)
/// and execution logic, and is dispatched dynamically through a
/// `ToolRegistry`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool (e.g. "run_query", "get_build_info")
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema describing the tool's input parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Self-description used by `ToolRegistry::help()`.
    ///
    /// The default derives a structured document from the name,
    /// description, and schema. A failing implementation is logged and
    /// skipped by the aggregator rather than failing the whole catalog.
    fn help(&self) -> CoreResult<Value> {
        let schema = serde_json::to_value(self.parameters_schema())?;
        Ok(serde_json::json!({
            "name": self.name(),
            "description": self.description(),
            "parameters": schema,
        }))
    }

    /// Execute the tool with the given context and arguments.
    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult;
}

/// Registry of available tools.
///
/// Provides O(1) lookup by name and deterministic iteration in
/// registration order. The catalog is built once at startup from an
/// explicit factory list and is immutable per orchestrator instance.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool.
    ///
    /// Tool names are globally unique within a registry; registering a
    /// duplicate name is a configuration error.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> CoreResult<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(CoreError::duplicate_tool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Register a whole factory-built tool set.
    pub fn register_all(&mut self, tools: Vec<Arc<dyn Tool>>) -> CoreResult<()> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool definitions, suitable for sending to the model.
    /// Returned in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// Invoke a tool by name.
    ///
    /// Fails with `UnknownTool` for absent names. A tool's own failure is
    /// wrapped as `ToolExecution` — raw errors never reach the caller.
    pub async fn invoke(
        &self,
        name: &str,
        ctx: &ToolInvocationContext,
        args: Value,
    ) -> CoreResult<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::unknown_tool(name))?;

        let result = tool.execute(ctx, args).await;
        if result.success {
            Ok(result.output.unwrap_or_default())
        } else {
            Err(CoreError::tool_execution(
                name,
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }

    /// Aggregate every registered tool's help into one JSON document.
    ///
    /// A tool whose own `help()` fails is logged and omitted; the rest
    /// of the catalog is still rendered.
    pub fn help(&self) -> String {
        let mut entries: Vec<Value> = Vec::new();
        for name in &self.order {
            let Some(tool) = self.tools.get(name) else {
                continue;
            };
            match tool.help() {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(tool = %name, error = %e, "skipping tool in help output");
                }
            }
        }

        serde_json::to_string_pretty(&serde_json::json!({ "tools": entries }))
            .unwrap_or_else(|_| "{\"tools\":[]}".to_string())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── FunctionTool ─────────────────────────────────────────────────────

/// Type alias for the async handler function used by `FunctionTool`.
pub type FunctionToolHandler = Box<
    dyn Fn(
            &ToolInvocationContext,
            Value,
        )
            -> std::pin::Pin<Box<dyn std::future::Future<Output = ToolResult> + Send + '_>>
        + Send
        + Sync,
>;

/// A tool created from an async closure.
///
/// Allows creation of simple tools without defining a dedicated struct —
/// used for static text tools and test doubles.
pub struct FunctionTool {
    tool_name: String,
    tool_description: String,
    schema: ParameterSchema,
    handler: FunctionToolHandler,
}

impl FunctionTool {
    /// Create a new FunctionTool from an async closure.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(
                &ToolInvocationContext,
                Value,
            )
                -> std::pin::Pin<Box<dyn std::future::Future<Output = ToolResult> + Send + '_>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            tool_name: name.into(),
            tool_description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn parameters_schema(&self) -> ParameterSchema {
        self.schema.clone()
    }

    async fn execute(&self, ctx: &ToolInvocationContext, args: Value) -> ToolResult {
        (self.handler)(ctx, args).await
    }
}
