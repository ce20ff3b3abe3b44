//! Dialogue Orchestrator
//!
//! The façade the hosting layer calls: given a session key and user
//! input, it retrieves or creates the session, sends the history plus
//! the tool catalog to the chat backend, auto-executes any tool calls
//! the model requests (clamping each result through the size guard),
//! and returns the final assistant message. Tool and model failures are
//! contained per turn — the caller always receives a coherent string.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use shipmate_core::{CoreError, CoreResult, Role, Turn};
use shipmate_llm::types::{Message, ToolCall};
use shipmate_llm::ChatBackend;
use shipmate_tools::size_guard;
use shipmate_tools::{ChunkPolicy, ToolInvocationContext, ToolRegistry};

use super::audit::{AuditEntry, AuditSink};
use super::store::SessionStore;

/// Fixed apology returned when the model call itself fails.
pub const APOLOGY: &str =
    "I'm sorry - something went wrong while processing your request. Please try again.";

/// Assistant message appended when the tool-round budget runs out.
const TOOL_BUDGET_MESSAGE: &str =
    "I couldn't complete the request within the allowed number of tool calls. \
     Try narrowing the question or asking for one piece at a time.";

/// Fallback when the model returns neither text nor tool calls.
const EMPTY_RESPONSE_MESSAGE: &str =
    "I wasn't able to produce a response. Please try rephrasing your request.";

/// Maximum length of a tool error surfaced into the conversation.
const TOOL_ERROR_MAX_LEN: usize = 600;

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum tool-call rounds per user turn
    pub max_tool_rounds: usize,
    /// How to resolve tool payloads over the transport byte ceiling
    pub oversize_policy: ChunkPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            oversize_policy: ChunkPolicy::FirstChunk,
        }
    }
}

/// Drives the conversation state machine for every session.
pub struct DialogueOrchestrator {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    audit: Option<Arc<dyn AuditSink>>,
    config: OrchestratorConfig,
    /// Built once at construction; the catalog is static per instance
    system_prompt: String,
}

impl DialogueOrchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let system_prompt = build_system_prompt(&registry);
        Self {
            backend,
            registry,
            sessions,
            audit: None,
            config,
            system_prompt,
        }
    }

    /// Attach an optional audit sink notified after successful tool calls.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Respond to one user input. The only operation a hosting layer needs.
    pub async fn respond(&self, session_key: &str, user_input: &str) -> CoreResult<String> {
        self.respond_with_cancellation(session_key, user_input, CancellationToken::new())
            .await
    }

    /// Respond with caller-controlled cancellation.
    ///
    /// Cancellation never corrupts the session: a cancelled model call
    /// or tool call is abandoned before any turn is appended for it.
    pub async fn respond_with_cancellation(
        &self,
        session_key: &str,
        user_input: &str,
        cancel: CancellationToken,
    ) -> CoreResult<String> {
        let handle = self.sessions.get_or_create(session_key)?;

        // Serialize whole turns per session; other sessions proceed freely.
        let _gate = handle.turn_gate.lock().await;
        let session = &handle.session;

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        session.append_user(user_input);

        let mut working = messages_from_history(&session.history());
        let tools = self.registry.definitions();
        let tool_ctx =
            ToolInvocationContext::with_cancellation(session_key, cancel.clone());

        let mut rounds = 0;
        loop {
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                r = self.backend.send_message(
                    working.clone(),
                    Some(self.system_prompt.clone()),
                    tools.clone(),
                ) => r,
            };

            // One model failure per user turn degrades to the apology;
            // the turn still gets exactly one terminal response.
            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(session = session_key, error = %e, "model call failed");
                    session.append_assistant(APOLOGY);
                    return Ok(APOLOGY.to_string());
                }
            };

            if response.has_tool_calls() {
                if rounds >= self.config.max_tool_rounds {
                    tracing::warn!(
                        session = session_key,
                        rounds,
                        "tool-round budget exhausted"
                    );
                    session.append_assistant(TOOL_BUDGET_MESSAGE);
                    return Ok(TOOL_BUDGET_MESSAGE.to_string());
                }

                working.push(Message::tool_use(
                    response.content.clone(),
                    &response.tool_calls,
                ));

                for call in &response.tool_calls {
                    let (content, is_error) =
                        self.execute_tool_call(session_key, call, &tool_ctx, &cancel).await?;

                    session.append_tool(&call.name, &content);
                    working.push(Message::tool_result(&call.id, &content, is_error));
                }

                rounds += 1;
                continue;
            }

            let text = response
                .content
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| EMPTY_RESPONSE_MESSAGE.to_string());
            session.append_assistant(&text);
            return Ok(text);
        }
    }

    /// Run one tool call and contain its failure.
    ///
    /// Returns `(turn content, is_error)`. Errors come back as bounded
    /// user-visible text so the model can react in the next round; only
    /// cancellation propagates, and it does so before anything is
    /// appended.
    async fn execute_tool_call(
        &self,
        session_key: &str,
        call: &ToolCall,
        tool_ctx: &ToolInvocationContext,
        cancel: &CancellationToken,
    ) -> CoreResult<(String, bool)> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        tracing::info!(session = session_key, tool = %call.name, "executing tool call");

        let invocation =
            self.registry
                .invoke(&call.name, tool_ctx, call.arguments.clone());
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            r = invocation => r,
        };

        match result {
            Ok(raw) => {
                let clamped =
                    size_guard::clamp_with_policy(raw, self.config.oversize_policy);
                self.notify_audit(session_key, call, &clamped).await;
                Ok((clamped, false))
            }
            Err(e) => {
                tracing::warn!(session = session_key, tool = %call.name, error = %e, "tool call failed");
                Ok((bounded_error_text(&e), true))
            }
        }
    }

    /// Best-effort audit notification; failures are logged, never surfaced.
    async fn notify_audit(&self, session_key: &str, call: &ToolCall, result: &str) {
        let Some(sink) = &self.audit else {
            return;
        };

        let entry = AuditEntry::new(
            session_key,
            &call.name,
            call.arguments.clone(),
            result,
        );
        if let Err(e) = sink.record(entry).await {
            tracing::warn!(tool = %call.name, error = %e, "audit sink failed");
        }
    }
}

/// Render the static system prompt from the tool catalog.
fn build_system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "You are Shipmate, a release-engineering assistant. You answer \
         questions about deployments, builds, pull requests, and work \
         items by calling the tools listed below. Prefer narrow queries; \
         oversized results are replaced with guidance instead of data.\n\n\
         Available tools:\n{}",
        registry.help()
    )
}

/// Map the durable turn history onto backend messages.
///
/// Tool turns from earlier user turns are replayed as plain context:
/// tool-call ids are provider-scoped to one in-flight exchange, so only
/// the current turn's loop uses native tool-use/tool-result blocks.
fn messages_from_history(turns: &[Turn]) -> Vec<Message> {
    turns
        .iter()
        .map(|turn| match turn.role {
            Role::System => Message::system(&turn.content),
            Role::User => Message::user(&turn.content),
            Role::Assistant => Message::assistant(&turn.content),
            Role::Tool => {
                let name = turn.tool_name.as_deref().unwrap_or("tool");
                Message::user(format!("Result of tool '{}':\n{}", name, turn.content))
            }
        })
        .collect()
}

/// Convert a tool failure into bounded user-visible text.
fn bounded_error_text(error: &CoreError) -> String {
    let mut text = error.to_string();
    if text.len() > TOOL_ERROR_MAX_LEN {
        let mut end = TOOL_ERROR_MAX_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("...");
    }
    text
}
