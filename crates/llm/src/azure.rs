//! Azure OpenAI Provider
//!
//! Implementation of the `ChatBackend` trait for Azure-OpenAI-compatible
//! chat-completion deployments with tool calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{missing_api_key_error, parse_http_error, ChatBackend};
use super::types::{
    LlmError, LlmResponse, LlmResult, Message, MessageContent, MessageRole, StopReason, ToolCall,
    ToolDefinition, UsageStats,
};

fn default_api_version() -> String {
    "2024-06-01".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Configuration for an Azure OpenAI deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// Deployment name, e.g. `gpt-4o-mini`
    pub deployment: String,
    /// API key; read from the environment by the hosting layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: "gpt-4o-mini".to_string(),
            api_key: None,
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Azure OpenAI chat-completion backend
pub struct AzureOpenAIProvider {
    config: BackendConfig,
    client: reqwest::Client,
}

impl AzureOpenAIProvider {
    /// Create a new provider with the given configuration.
    ///
    /// Fails if the endpoint is not a valid URL.
    pub fn new(config: BackendConfig) -> LlmResult<Self> {
        url::Url::parse(&config.endpoint).map_err(|e| LlmError::InvalidRequest {
            message: format!("Invalid endpoint '{}': {}", config.endpoint, e),
        })?;
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    /// Chat-completions URL for the configured deployment
    fn request_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let mut wire_messages: Vec<serde_json::Value> = Vec::new();

        if let Some(sys) = system {
            wire_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }

        for msg in messages {
            wire_messages.push(Self::message_to_wire(msg));
        }

        body["messages"] = serde_json::json!(wire_messages);

        if !tools.is_empty() {
            let wire_tools: Vec<serde_json::Value> =
                tools.iter().map(Self::tool_to_wire).collect();
            body["tools"] = serde_json::json!(wire_tools);
        }

        body
    }

    /// Convert a Message to the chat-completions wire format
    fn message_to_wire(message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };

        let has_tool_calls = message
            .content
            .iter()
            .any(|c| matches!(c, MessageContent::ToolUse { .. }));
        let has_tool_results = message
            .content
            .iter()
            .any(|c| matches!(c, MessageContent::ToolResult { .. }));

        if has_tool_results {
            // Tool results are sent as role "tool" messages
            let mut result_msg = serde_json::json!({
                "role": "tool"
            });

            for content in &message.content {
                if let MessageContent::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } = content
                {
                    result_msg["tool_call_id"] = serde_json::json!(tool_use_id);
                    result_msg["content"] = serde_json::json!(content);
                    break;
                }
            }

            return result_msg;
        }

        if has_tool_calls {
            let tool_calls: Vec<serde_json::Value> = message
                .content
                .iter()
                .filter_map(|c| {
                    if let MessageContent::ToolUse { id, name, input } = c {
                        Some(serde_json::json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string()
                            }
                        }))
                    } else {
                        None
                    }
                })
                .collect();

            let text_content = Self::joined_text(message);

            let mut msg = serde_json::json!({
                "role": role,
                "tool_calls": tool_calls
            });

            if !text_content.is_empty() {
                msg["content"] = serde_json::json!(text_content);
            }

            return msg;
        }

        serde_json::json!({
            "role": role,
            "content": Self::joined_text(message)
        })
    }

    fn joined_text(message: &Message) -> String {
        message
            .content
            .iter()
            .filter_map(|c| {
                if let MessageContent::Text { text } = c {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Convert a ToolDefinition to the function-calling wire format
    fn tool_to_wire(tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema
            }
        })
    }

    /// Parse a chat-completions response body
    fn parse_response(&self, response: &WireResponse) -> LlmResponse {
        let choice = response.choices.first();

        let mut content = None;
        let mut tool_calls = Vec::new();

        if let Some(choice) = choice {
            if let Some(msg) = &choice.message {
                content = msg.content.clone();

                if let Some(tcs) = &msg.tool_calls {
                    for tc in tcs {
                        let arguments: serde_json::Value =
                            serde_json::from_str(&tc.function.arguments)
                                .unwrap_or(serde_json::Value::Null);

                        tool_calls.push(ToolCall {
                            id: tc.id.clone(),
                            name: tc.function.name.clone(),
                            arguments,
                        });
                    }
                }
            }
        }

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_ref())
            .map(|r| StopReason::from(r.as_str()))
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            tool_calls,
            stop_reason,
            usage,
            model: response
                .model
                .clone()
                .unwrap_or_else(|| self.config.deployment.clone()),
        }
    }

    async fn post(&self, body: serde_json::Value) -> LlmResult<WireResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("azure-openai"))?;

        let response = self
            .client
            .post(self.request_url())
            .header("api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "azure-openai"));
        }

        serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse response: {}", e),
        })
    }
}

#[async_trait]
impl ChatBackend for AzureOpenAIProvider {
    fn name(&self) -> &'static str {
        "azure-openai"
    }

    fn model(&self) -> &str {
        &self.config.deployment
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
    ) -> LlmResult<LlmResponse> {
        tracing::debug!(
            deployment = %self.config.deployment,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat completion request"
        );
        let body = self.build_request_body(&messages, system.as_deref(), &tools);
        let wire = self.post(body).await?;
        Ok(self.parse_response(&wire))
    }

    async fn health_check(&self) -> LlmResult<()> {
        // A minimal one-token completion validates endpoint, deployment,
        // and API key in one round-trip.
        let mut body =
            self.build_request_body(&[Message::user("ping")], None, &[]);
        body["max_tokens"] = serde_json::json!(1);
        self.post(body).await.map(|_| ())
    }
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: Option<WireMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> AzureOpenAIProvider {
        AzureOpenAIProvider::new(BackendConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            deployment: "gpt-4o-mini".to_string(),
            api_key: Some("test-key".to_string()),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = AzureOpenAIProvider::new(BackendConfig {
            endpoint: "not a url".to_string(),
            ..BackendConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_request_url() {
        let provider = test_provider();
        assert_eq!(
            provider.request_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_request_url_strips_trailing_slash() {
        let provider = AzureOpenAIProvider::new(BackendConfig {
            endpoint: "https://example.openai.azure.com/".to_string(),
            ..BackendConfig::default()
        })
        .unwrap();
        assert!(!provider.request_url().contains(".com//"));
    }

    #[test]
    fn test_build_request_body_includes_system_and_tools() {
        let provider = test_provider();
        let tools = vec![ToolDefinition {
            name: "run_query".to_string(),
            description: "Execute a query".to_string(),
            input_schema: crate::types::ParameterSchema::object(
                None,
                std::collections::HashMap::new(),
                vec![],
            ),
        }];
        let body = provider.build_request_body(
            &[Message::user("hello")],
            Some("You are a release assistant."),
            &tools,
        );

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "run_query");
    }

    #[test]
    fn test_tool_result_message_to_wire() {
        let msg = Message::tool_result("call_9", "rows: 3", false);
        let wire = AzureOpenAIProvider::message_to_wire(&msg);
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_9");
        assert_eq!(wire["content"], "rows: 3");
    }

    #[test]
    fn test_tool_use_message_to_wire() {
        let calls = vec![ToolCall {
            id: "call_1".to_string(),
            name: "list_clusters".to_string(),
            arguments: serde_json::json!({}),
        }];
        let msg = Message::tool_use(None, &calls);
        let wire = AzureOpenAIProvider::message_to_wire(&msg);
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "list_clusters");
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let provider = test_provider();
        let wire: WireResponse = serde_json::from_str(
            r#"{
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc",
                            "type": "function",
                            "function": {
                                "name": "run_query",
                                "arguments": "{\"cluster\": \"devops\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 7}
            }"#,
        )
        .unwrap();

        let response = provider.parse_response(&wire);
        assert!(response.has_tool_calls());
        assert_eq!(response.tool_calls[0].name, "run_query");
        assert_eq!(response.tool_calls[0].arguments["cluster"], "devops");
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.usage.total_tokens(), 19);
    }

    #[test]
    fn test_parse_response_plain_text() {
        let provider = test_provider();
        let wire: WireResponse = serde_json::from_str(
            r#"{
                "choices": [{
                    "message": {"content": "All done."},
                    "finish_reason": "stop"
                }]
            }"#,
        )
        .unwrap();

        let response = provider.parse_response(&wire);
        assert_eq!(response.content.as_deref(), Some("All done."));
        assert!(response.is_final());
        assert_eq!(response.model, "gpt-4o-mini");
    }
}
