//! Model client abstraction
//!
//! A [`ModelClient`] sends an ordered conversation to a language model and
//! returns exactly one assistant message. Backends differ only in transport and
//! configuration; [`create_model_client`] picks one from [`ModelClientProperties`].

use crate::llm::providers::{AnthropicConfig, AnthropicModelClient, OpenAiConfig, OpenAiModelClient};
use crate::protocol::ChatMessage;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Language model backend used by the LLM and hybrid resolvers
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `messages` in order and return the model's reply as an assistant message
    async fn call(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ModelClientError>;
}

/// Model backend failures
#[derive(Debug, Clone, Error)]
pub enum ModelClientError {
    #[error("Model client not configured: {0}")]
    NotConfigured(String),
    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Model returned no content")]
    EmptyResponse,
}

impl ModelClientError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelClientError::NetworkError(_) | ModelClientError::ServerError { .. } => true,
            _ => false,
        }
    }
}

/// Supported model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProvider {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
    /// Any OpenAI-compatible endpoint; requires a base URL
    Other,
}

impl FromStr for ClientProvider {
    type Err = ModelClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "other" => Ok(Self::Other),
            other => Err(ModelClientError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Model client configuration surface
#[derive(Clone, PartialEq, Deserialize)]
pub struct ModelClientProperties {
    /// Provider id: openai, anthropic, gemini, ollama or other
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    /// Response-format hint, e.g. `json_object`
    #[serde(default)]
    pub format: Option<String>,
    /// Only the Anthropic backend sends `top_k`; the OpenAI-compatible ones ignore it
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

fn default_max_tokens() -> u32 {
    2000
}

impl fmt::Debug for ModelClientProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClientProperties")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("format", &self.format)
            .field("top_k", &self.top_k)
            .field("top_p", &self.top_p)
            .finish()
    }
}

impl ModelClientProperties {
    pub fn new<P: Into<String>, M: Into<String>>(provider: P, model: M) -> Self {
        Self {
            provider: provider.into(),
            api_key: None,
            base_url: None,
            model: model.into(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            format: None,
            top_k: None,
            top_p: None,
        }
    }

    /// Routing defaults for the OpenAI API: gpt-4o-mini, 200 tokens, JSON replies
    pub fn openai_defaults<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: Some(OPENAI_BASE_URL.to_string()),
            max_tokens: 200,
            format: Some("json_object".to_string()),
            ..Self::new("openai", "gpt-4o-mini")
        }
    }
}

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn required_api_key(
    properties: &ModelClientProperties,
    provider: ClientProvider,
) -> Result<String, ModelClientError> {
    properties
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ModelClientError::NotConfigured(format!("{provider} requires an API key")))
}

/// `top_k` that is configured but has no effect on `provider`
fn ignored_top_k(properties: &ModelClientProperties, provider: ClientProvider) -> Option<u32> {
    match provider {
        ClientProvider::Anthropic => None,
        _ => properties.top_k,
    }
}

/// Build the backend named by `properties.provider`
pub fn create_model_client(
    properties: &ModelClientProperties,
) -> Result<Arc<dyn ModelClient>, ModelClientError> {
    let provider: ClientProvider = properties.provider.parse()?;
    if let Some(top_k) = ignored_top_k(properties, provider) {
        debug!(%provider, top_k, "top_k is not supported by this provider and is ignored");
    }

    let openai_compatible = |base_url: String, api_key: Option<String>| {
        OpenAiModelClient::new(OpenAiConfig {
            api_key,
            base_url,
            model: properties.model.clone(),
            max_tokens: Some(properties.max_tokens),
            temperature: Some(properties.temperature),
            top_p: properties.top_p,
            response_format: properties.format.clone(),
            timeout: DEFAULT_TIMEOUT,
        })
    };

    let client: Arc<dyn ModelClient> = match provider {
        ClientProvider::OpenAi => Arc::new(openai_compatible(
            properties
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            Some(required_api_key(properties, provider)?),
        )?),
        ClientProvider::Gemini => Arc::new(openai_compatible(
            properties
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_OPENAI_BASE_URL.to_string()),
            Some(required_api_key(properties, provider)?),
        )?),
        ClientProvider::Ollama => {
            let base = properties
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string());
            Arc::new(openai_compatible(
                format!("{}/v1", base.trim_end_matches('/')),
                properties.api_key.clone(),
            )?)
        }
        ClientProvider::Other => {
            let base_url = properties.base_url.clone().ok_or_else(|| {
                ModelClientError::NotConfigured("base_url is required for other provider".into())
            })?;
            Arc::new(openai_compatible(base_url, properties.api_key.clone())?)
        }
        ClientProvider::Anthropic => {
            let mut config = AnthropicConfig {
                api_key: required_api_key(properties, provider)?,
                model: properties.model.clone(),
                max_tokens: properties.max_tokens,
                temperature: Some(properties.temperature),
                top_p: properties.top_p,
                top_k: properties.top_k,
                ..Default::default()
            };
            if let Some(base_url) = &properties.base_url {
                config.base_url = base_url.clone();
            }
            Arc::new(AnthropicModelClient::new(config)?)
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<ClientProvider>().unwrap(), ClientProvider::OpenAi);
        assert_eq!("ANTHROPIC".parse::<ClientProvider>().unwrap(), ClientProvider::Anthropic);
        assert_eq!("gemini".parse::<ClientProvider>().unwrap(), ClientProvider::Gemini);
        assert_eq!("ollama".parse::<ClientProvider>().unwrap(), ClientProvider::Ollama);
        assert_eq!("other".parse::<ClientProvider>().unwrap(), ClientProvider::Other);
        assert!(matches!(
            "bedrock".parse::<ClientProvider>(),
            Err(ModelClientError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_openai_defaults() {
        let properties = ModelClientProperties::openai_defaults("sk-test");
        assert_eq!(properties.provider, "openai");
        assert_eq!(properties.model, "gpt-4o-mini");
        assert_eq!(properties.max_tokens, 200);
        assert_eq!(properties.temperature, 0.0);
        assert_eq!(properties.format.as_deref(), Some("json_object"));
        assert_eq!(properties.base_url.as_deref(), Some(OPENAI_BASE_URL));
    }

    #[test]
    fn test_properties_debug_hides_api_key() {
        let properties = ModelClientProperties::openai_defaults("sk-very-secret");
        let debug = format!("{properties:?}");
        assert!(!debug.contains("sk-very-secret"));
    }

    #[test]
    fn test_properties_deserialize_with_defaults() {
        let properties: ModelClientProperties =
            toml::from_str("provider = \"ollama\"\nmodel = \"llama3\"").unwrap();
        assert_eq!(properties.max_tokens, 2000);
        assert_eq!(properties.temperature, 0.0);
        assert!(properties.api_key.is_none());
        assert!(properties.top_k.is_none());
    }

    #[test]
    fn test_factory_requires_api_key_for_openai() {
        let properties = ModelClientProperties::new("openai", "gpt-4o-mini");
        assert!(matches!(
            create_model_client(&properties),
            Err(ModelClientError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_factory_requires_base_url_for_other() {
        let properties = ModelClientProperties::new("other", "local-model");
        assert!(matches!(
            create_model_client(&properties),
            Err(ModelClientError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_factory_builds_known_providers() {
        let mut properties = ModelClientProperties::new("ollama", "llama3");
        assert!(create_model_client(&properties).is_ok());

        properties.provider = "anthropic".to_string();
        properties.api_key = Some("key".to_string());
        assert!(create_model_client(&properties).is_ok());

        properties.provider = "gemini".to_string();
        assert!(create_model_client(&properties).is_ok());
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let properties = ModelClientProperties::new("watson", "x");
        assert!(matches!(
            create_model_client(&properties),
            Err(ModelClientError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_top_k_only_applies_to_anthropic() {
        let mut properties = ModelClientProperties::new("openai", "gpt-4o-mini");
        assert_eq!(ignored_top_k(&properties, ClientProvider::OpenAi), None);

        properties.top_k = Some(40);
        assert_eq!(ignored_top_k(&properties, ClientProvider::OpenAi), Some(40));
        assert_eq!(ignored_top_k(&properties, ClientProvider::Ollama), Some(40));
        assert_eq!(ignored_top_k(&properties, ClientProvider::Anthropic), None);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ModelClientError::NetworkError("reset".into()).is_retryable());
        assert!(ModelClientError::ServerError {
            status: 502,
            message: "bad gateway".into()
        }
        .is_retryable());
        assert!(!ModelClientError::ApiError("upstream server error".into()).is_retryable());
        assert!(!ModelClientError::AuthenticationFailed("401".into()).is_retryable());
    }
}
