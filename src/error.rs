//! Resolution error taxonomy
//!
//! Lower layers each own their error type (`ProviderError`, `ModelClientError`,
//! `EmbeddingError`, `VectorError`). Crossing into `resolve` they are wrapped
//! into [`ResolverError`] so callers deal with a single type, while `source()`
//! still reaches the original cause.
//!
//! "No agent found" is not an error: resolvers return `Ok(None)` for it.

use crate::llm::ModelClientError;
use crate::registry::ProviderError;
use crate::vector::VectorError;
use std::sync::OnceLock;
use thiserror::Error;

/// Boxed error used where a layer wraps an arbitrary cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Umbrella error returned by every resolution strategy
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Failed to resolve agent spec: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to call language model: {0}")]
    ModelClient(#[from] ModelClientError),

    #[error("Failed to search agent vectors: {0}")]
    Vector(#[from] VectorError),

    #[error("Failed to build routing prompt: {message}")]
    Prompt {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid model response '{response}': {source}")]
    InvalidModelResponse {
        response: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ResolverError {
    /// Create prompt construction error
    pub fn prompt<S: Into<String>>(message: S) -> Self {
        Self::Prompt {
            message: message.into(),
            source: None,
        }
    }

    /// Create prompt construction error with its cause
    pub fn prompt_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::Prompt {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Error message safe to write to logs or return to a gateway client
    pub fn sanitized_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;

fn secret_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+")
            .unwrap_or_else(|e| panic!("secret pattern is a valid regex: {e}"))
    })
}

fn bearer_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"(?i)bearer\s+\S+")
            .unwrap_or_else(|e| panic!("bearer pattern is a valid regex: {e}"))
    })
}

/// Redact credentials and truncate an error message for logging
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = secret_pattern()
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = bearer_pattern()
        .replace_all(&sanitized, "Bearer ***")
        .to_string();

    // Keep the total length at or below 500 bytes on a char boundary
    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let mut cut = 500 - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}
