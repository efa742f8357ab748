//! Text embedding backends

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const OLLAMA_EMBEDDINGS_URL: &str = "http://localhost:11434/api/embeddings";
pub const OLLAMA_EMBEDDING_MODEL: &str = "all-minilm";
pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_BATCH_SIZE: usize = 300;

/// Embedding backend failures
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding client not configured: {0}")]
    NotConfigured(String),
    #[error("Embedding network error: {0}")]
    NetworkError(String),
    #[error("Embedding API error: {0}")]
    ApiError(String),
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Turns text into fixed-length vectors
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError>;

    /// Embed several texts; output order matches input order
    async fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, EmbeddingError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EmbeddingError::NetworkError(e.to_string()))
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, EmbeddingError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Embedding API error - Status: {}", status);
        return Err(EmbeddingError::ApiError(format!("{status} - {body}")));
    }
    response
        .json()
        .await
        .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))
}

/// Ollama embedding client configuration
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingConfig {
    pub url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            url: OLLAMA_EMBEDDINGS_URL.to_string(),
            model: OLLAMA_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Ollama `/api/embeddings`; one request per text
pub struct OllamaEmbeddingClient {
    config: OllamaEmbeddingConfig,
    client: Client,
}

impl OllamaEmbeddingClient {
    pub fn new(config: OllamaEmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = build_http_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f64>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&OllamaEmbeddingRequest {
                model: &self.config.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::NetworkError(e.to_string()))?;

        let body: OllamaEmbeddingResponse = read_json(response).await?;
        Ok(body.embedding)
    }
}

/// OpenAI embedding client configuration
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    pub api_key: String,
    pub url: String,
    pub model: String,
    /// Maximum texts per request
    pub batch_size: usize,
    pub timeout: Duration,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: OPENAI_EMBEDDINGS_URL.to_string(),
            model: OPENAI_EMBEDDING_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(60),
        }
    }
}

/// OpenAI `/v1/embeddings` with batched requests
pub struct OpenAiEmbeddingClient {
    config: OpenAiEmbeddingConfig,
    client: Client,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: OpenAiEmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.is_empty() {
            return Err(EmbeddingError::NotConfigured(
                "OpenAI API key is required".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(EmbeddingError::NotConfigured(
                "batch size must be greater than zero".to_string(),
            ));
        }
        let client = build_http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbeddingError> {
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&OpenAiEmbeddingRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::NetworkError(e.to_string()))?;

        let body: OpenAiEmbeddingResponse = read_json(response).await?;
        Self::ordered_embeddings(body, texts.len())
    }

    fn ordered_embeddings(
        response: OpenAiEmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f64>>, EmbeddingError> {
        if response.data.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {expected} embeddings, got {}",
                response.data.len()
            )));
        }
        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f64>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        self.embed_chunk(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))
    }

    async fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            debug!(chunk_size = chunk.len(), "Embedding batch");
            embeddings.extend(self.embed_chunk(chunk).await?);
        }
        Ok(embeddings)
    }
}
