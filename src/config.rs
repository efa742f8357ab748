//! TOML configuration for the `agent-router` binary
//!
//! The library never reads configuration or the environment itself; the
//! binary loads a [`RouterConfig`] and wires backends from it. Credentials are
//! referenced by environment variable name and resolved on demand.

use crate::llm::{AgentRoutingSpecListType, ModelClientProperties};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level router configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    pub registry: RegistrySection,
    #[serde(default)]
    pub routing: RoutingSection,
    pub llm: Option<LlmSection>,
    pub embedding: Option<EmbeddingSection>,
    pub vector: Option<VectorSection>,
}

/// Agent registry source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrySection {
    /// JSON file holding the agent routing specs
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutingSection {
    #[serde(default)]
    pub strategy: RoutingStrategy,
}

/// Resolution strategy selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStrategy {
    #[default]
    Llm,
    Vector,
    Hybrid,
}

impl RoutingStrategy {
    fn needs_llm(&self) -> bool {
        matches!(self, Self::Llm | Self::Hybrid)
    }

    fn needs_vector(&self) -> bool {
        matches!(self, Self::Vector | Self::Hybrid)
    }
}

/// Model client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// openai, anthropic, gemini, ollama or other
    pub provider: String,
    pub model: String,
    /// Environment variable containing the API key
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    pub format: Option<String>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    /// Prompt template file; the built-in prompt is used when absent
    pub prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub agents_list: AgentRoutingSpecListType,
}

fn default_max_tokens() -> u32 {
    2000
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSection {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    /// Endpoint URL; provider default when absent
    pub url: Option<String>,
    /// Model name; provider default when absent
    pub model: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub api_key_env: Option<String>,
}

fn default_batch_size() -> usize {
    crate::vector::DEFAULT_BATCH_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorSection {
    /// JSON array of `{"agentName", "text"}` documents to seed at startup
    pub seed_file: Option<PathBuf>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    crate::vector::DEFAULT_LIMIT
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouterConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the chosen strategy has the sections it needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        let strategy = self.routing.strategy;

        if strategy.needs_llm() && self.llm.is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "{strategy:?} routing strategy requires an [llm] section"
            )));
        }
        if strategy.needs_vector() {
            if self.embedding.is_none() {
                return Err(ConfigError::InvalidConfig(format!(
                    "{strategy:?} routing strategy requires an [embedding] section"
                )));
            }
            let vector = self.vector.as_ref().ok_or_else(|| {
                ConfigError::InvalidConfig(format!(
                    "{strategy:?} routing strategy requires a [vector] section"
                ))
            })?;
            if vector.limit == 0 {
                return Err(ConfigError::InvalidConfig(
                    "vector.limit must be greater than zero".to_string(),
                ));
            }
        }
        if let Some(embedding) = &self.embedding {
            if embedding.batch_size == 0 {
                return Err(ConfigError::InvalidConfig(
                    "embedding.batch_size must be greater than zero".to_string(),
                ));
            }
        }
        if let Some(llm) = &self.llm {
            if !(0.0..=2.0).contains(&llm.temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {} is outside 0.0..=2.0",
                    llm.temperature
                )));
            }
        }
        Ok(())
    }

    /// Helper method to get environment variable with consistent error handling
    fn get_env_var_optional(env_var_name: Option<&String>) -> Option<String> {
        env_var_name.and_then(|name| std::env::var(name).ok())
    }

    /// Helper method to get environment variable with error propagation
    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Model client properties with the API key resolved from the environment
    ///
    /// A configured but unset `api_key_env` is an error; no `api_key_env` at
    /// all means the backend needs no key.
    pub fn model_client_properties(&self) -> Result<ModelClientProperties, ConfigError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| ConfigError::InvalidConfig("missing [llm] section".to_string()))?;

        let api_key = llm
            .api_key_env
            .as_deref()
            .map(Self::get_env_var_required)
            .transpose()?;

        Ok(ModelClientProperties {
            provider: llm.provider.clone(),
            api_key,
            base_url: llm.base_url.clone(),
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            format: llm.format.clone(),
            top_k: llm.top_k,
            top_p: llm.top_p,
        })
    }

    /// Embedding API key, if an `api_key_env` is configured and set
    pub fn get_embedding_api_key(&self) -> Option<String> {
        Self::get_env_var_optional(
            self.embedding
                .as_ref()
                .and_then(|embedding| embedding.api_key_env.as_ref()),
        )
    }
}
