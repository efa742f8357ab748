//! OpenAI-compatible chat completion client
//!
//! Serves OpenAI itself plus every backend that speaks the same
//! `/chat/completions` dialect (Gemini's compatibility endpoint, Ollama's `/v1`
//! surface, self-hosted gateways).

use crate::llm::client::{ModelClient, ModelClientError, OPENAI_BASE_URL};
use crate::llm::providers::http::{map_status_error, with_retry};
use crate::model_span;
use crate::protocol::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn, Instrument};

/// OpenAI-compatible client configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    /// `response_format.type`, e.g. `json_object`
    pub response_format: Option<String>,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            response_format: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Model client for OpenAI-compatible endpoints
pub struct OpenAiModelClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiModelClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ModelClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ModelClientError::NotConfigured(
                "base URL is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelClientError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn convert_message(message: &ChatMessage) -> OpenAiMessage {
        OpenAiMessage {
            role: message.role().to_string(),
            content: Some(message.content().to_string()),
        }
    }

    fn build_request(config: &OpenAiConfig, messages: &[ChatMessage]) -> OpenAiCompletionRequest {
        OpenAiCompletionRequest {
            model: config.model.clone(),
            messages: messages.iter().map(Self::convert_message).collect(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            response_format: config
                .response_format
                .as_ref()
                .map(|format_type| OpenAiResponseFormat {
                    format_type: format_type.clone(),
                }),
        }
    }

    fn parse_completion_response(
        response: OpenAiCompletionResponse,
    ) -> Result<ChatMessage, ModelClientError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ModelClientError::InvalidResponse("No choices returned from model".to_string())
        })?;

        match choice.message.content {
            Some(content) if !content.is_empty() => Ok(ChatMessage::assistant(content)),
            _ => Err(ModelClientError::EmptyResponse),
        }
    }

    async fn make_api_request(
        &self,
        request: &OpenAiCompletionRequest,
    ) -> Result<OpenAiCompletionResponse, ModelClientError> {
        let mut builder = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            let error_msg = format!(
                "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                e,
                e.is_connect(),
                e.is_timeout()
            );
            warn!("Model network error details: {}", error_msg);
            ModelClientError::NetworkError(error_msg)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status_error("OpenAI", status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ModelClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for OpenAiModelClient {
    async fn call(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ModelClientError> {
        let span = model_span!(provider = "openai", model = %self.config.model);
        self.call_with_retry(messages).instrument(span).await
    }
}

impl OpenAiModelClient {
    async fn call_with_retry(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ChatMessage, ModelClientError> {
        let request = Self::build_request(&self.config, messages);
        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let request = &request;
        let response = with_retry(move || self.make_api_request(request)).await?;
        Self::parse_completion_response(response)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config_default() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_client_requires_base_url() {
        let config = OpenAiConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            OpenAiModelClient::new(config),
            Err(ModelClientError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_message_conversion() {
        let converted = OpenAiModelClient::convert_message(&ChatMessage::system("route"));
        assert_eq!(converted.role, "system");
        assert_eq!(converted.content.as_deref(), Some("route"));
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let config = OpenAiConfig {
            response_format: Some("json_object".to_string()),
            max_tokens: Some(200),
            ..Default::default()
        };
        let request = OpenAiModelClient::build_request(
            &config,
            &[ChatMessage::system("s"), ChatMessage::user("u")],
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("temperature").is_none());
        assert!(json.get("top_p").is_none());
    }

    #[test]
    fn test_parse_completion_response() {
        let response: OpenAiCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"agentName\":\"a\"}"}}]}"#,
        )
        .unwrap();
        let message = OpenAiModelClient::parse_completion_response(response).unwrap();
        assert_eq!(message, ChatMessage::assistant(r#"{"agentName":"a"}"#));
    }

    #[test]
    fn test_parse_empty_choices() {
        let response: OpenAiCompletionResponse =
            serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            OpenAiModelClient::parse_completion_response(response),
            Err(ModelClientError::InvalidResponse(_))
        ));

        let response: OpenAiCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(matches!(
            OpenAiModelClient::parse_completion_response(response),
            Err(ModelClientError::EmptyResponse)
        ));
    }
}
