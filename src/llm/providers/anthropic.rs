//! Anthropic messages API client

use crate::llm::client::{ModelClient, ModelClientError};
use crate::llm::providers::http::{map_status_error, with_retry};
use crate::model_span;
use crate::protocol::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn, Instrument};

/// Anthropic client configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub version: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            version: "2023-06-01".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            max_tokens: 2000,
            temperature: None,
            top_p: None,
            top_k: None,
        }
    }
}

/// Model client for the Anthropic messages API
pub struct AnthropicModelClient {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicModelClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, ModelClientError> {
        if config.api_key.is_empty() {
            return Err(ModelClientError::NotConfigured(
                "Anthropic API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelClientError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Split the conversation into the top-level system prompt and the turn list
    ///
    /// Multiple system messages are joined with a blank line, in order.
    fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_parts = Vec::new();
        let mut turns = Vec::new();

        for message in messages {
            match message {
                ChatMessage::System(content) => system_parts.push(content.as_str()),
                ChatMessage::User(content) | ChatMessage::Assistant(content) => {
                    turns.push(AnthropicMessage {
                        role: message.role().to_string(),
                        content: content.clone(),
                    })
                }
            }
        }

        let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));
        (system, turns)
    }

    fn build_request(config: &AnthropicConfig, messages: &[ChatMessage]) -> AnthropicCompletionRequest {
        let (system, messages) = Self::convert_messages(messages);
        AnthropicCompletionRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            messages,
            system,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
        }
    }

    fn parse_completion_response(
        response: AnthropicCompletionResponse,
    ) -> Result<ChatMessage, ModelClientError> {
        let content = response
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(ModelClientError::EmptyResponse);
        }
        Ok(ChatMessage::assistant(content))
    }
}

#[async_trait]
impl ModelClient for AnthropicModelClient {
    async fn call(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ModelClientError> {
        let span = model_span!(provider = "anthropic", model = %self.config.model);
        self.send(messages).instrument(span).await
    }
}

impl AnthropicModelClient {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ModelClientError> {
        let request = Self::build_request(&self.config, messages);
        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            "Sending Anthropic messages request"
        );

        let request = &request;
        let response = with_retry(move || self.make_api_request(request)).await?;
        Self::parse_completion_response(response)
    }

    async fn make_api_request(
        &self,
        request: &AnthropicCompletionRequest,
    ) -> Result<AnthropicCompletionResponse, ModelClientError> {
        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.version)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ModelClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Anthropic API error - Status: {}", status);
            return Err(map_status_error("Anthropic", status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ModelClientError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AnthropicCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicCompletionResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}
