//! Shipmate REPL
//!
//! Interactive console front end: wires the chat backend, the built-in
//! tool set, and the offline sample collaborators into a dialogue
//! orchestrator and processes user input in a loop.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use shipmate::chat::{
    DialogueOrchestrator, DocumentAuditSink, OrchestratorConfig, SessionStore,
};
use shipmate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use shipmate::offline::{InMemoryDocumentStore, InMemoryWorkItemClient, SampleQueryExecutor};
use shipmate_llm::AzureOpenAIProvider;
use shipmate_tools::{builtin_tools, BuiltinToolDeps, ClusterCatalog, ToolRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shipmate=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config =
        AppConfig::load(&config_path).with_context(|| format!("loading {config_path}"))?;

    let backend = Arc::new(AzureOpenAIProvider::new(config.model.clone())?);

    // Offline sample backends; a hosting deployment swaps in real ones.
    let catalog = Arc::new(ClusterCatalog::builtin());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let deps = BuiltinToolDeps {
        catalog: catalog.clone(),
        queries: Arc::new(SampleQueryExecutor::new(catalog)),
        documents: documents.clone(),
        work_items: Arc::new(InMemoryWorkItemClient::new()),
    };

    let mut registry = ToolRegistry::new();
    registry.register_all(builtin_tools(&deps))?;

    let orchestrator = DialogueOrchestrator::new(
        backend,
        Arc::new(registry),
        Arc::new(SessionStore::new()),
        OrchestratorConfig {
            max_tool_rounds: config.chat.max_tool_rounds,
            oversize_policy: config.chat.oversize_policy,
        },
    )
    .with_audit_sink(Arc::new(DocumentAuditSink::new(documents, "query-audit")));

    let session_key = uuid::Uuid::new_v4().to_string();
    println!("Welcome to the Shipmate REPL! Try asking about a build id. Type 'exit' to quit.");

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        match orchestrator.respond(&session_key, input).await {
            Ok(reply) => println!("Assistant > {reply}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}
