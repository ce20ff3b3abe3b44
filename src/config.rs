//! Configuration
//!
//! TOML-backed application configuration with environment overrides.
//! Secrets stay out of the file: the API key is taken from the
//! environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use shipmate_core::{CoreError, CoreResult};
use shipmate_llm::BackendConfig;
use shipmate_tools::ChunkPolicy;

/// Environment variable holding the chat-backend API key.
pub const API_KEY_ENV: &str = "SHIPMATE_API_KEY";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "shipmate.toml";

/// Chat tuning section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum tool-call rounds per user turn
    pub max_tool_rounds: usize,
    /// How to resolve tool payloads over the transport byte ceiling
    pub oversize_policy: ChunkPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            oversize_policy: ChunkPolicy::FirstChunk,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-backend deployment settings
    pub model: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Parse a configuration document.
    pub fn from_toml(raw: &str) -> CoreResult<Self> {
        let mut config: AppConfig = toml::from_str(raw)
            .map_err(|e| CoreError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CoreError::config(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml(&raw)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.model.endpoint.trim().is_empty() {
            return Err(CoreError::config("model.endpoint must not be empty"));
        }
        if self.model.deployment.trim().is_empty() {
            return Err(CoreError::config("model.deployment must not be empty"));
        }
        if self.chat.max_tool_rounds == 0 {
            return Err(CoreError::config("chat.max_tool_rounds must be at least 1"));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.model.api_key = Some(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [model]
        endpoint = "https://example.openai.azure.com"
        deployment = "gpt-4o-mini"

        [chat]
        max_tool_rounds = 4
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.model.endpoint, "https://example.openai.azure.com");
        assert_eq!(config.model.deployment, "gpt-4o-mini");
        assert_eq!(config.model.api_version, "2024-06-01");
        assert_eq!(config.chat.max_tool_rounds, 4);
    }

    #[test]
    fn test_oversize_policy_parses() {
        let config = AppConfig::from_toml(
            r#"
            [model]
            endpoint = "https://example.openai.azure.com"
            deployment = "gpt-4o-mini"

            [chat]
            oversize_policy = "discard"
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.oversize_policy, ChunkPolicy::Discard);
        assert_eq!(config.chat.max_tool_rounds, 8);
    }

    #[test]
    fn test_chat_section_is_optional() {
        let config = AppConfig::from_toml(
            r#"
            [model]
            endpoint = "https://example.openai.azure.com"
            deployment = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.max_tool_rounds, 8);
    }

    #[test]
    fn test_missing_endpoint_is_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [model]
            endpoint = ""
            deployment = "gpt-4o-mini"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_zero_tool_rounds_is_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [model]
            endpoint = "https://example.openai.azure.com"
            deployment = "gpt-4o-mini"

            [chat]
            max_tool_rounds = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shipmate.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.model.deployment, "gpt-4o-mini");

        let missing = AppConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(missing.unwrap_err(), CoreError::Config(_)));
    }
}
