//! Mock backends and fixtures for tests
//!
//! Provides scripted [`ModelClient`] and [`EmbeddingClient`] implementations so
//! resolvers can be exercised without network access.

use crate::llm::{ModelClient, ModelClientError};
use crate::protocol::ChatMessage;
use crate::registry::{Address, AgentRoutingSpec, AgentSpecSet, Capability, FilterError, SpecFilter};
use crate::vector::{EmbeddingClient, EmbeddingError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Model client that replays canned replies in order, cycling at the end
#[derive(Debug, Default)]
pub struct MockModelClient {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub should_fail: bool,
    received: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Reply shaped like the default prompt's answer format
    pub fn answering(agent_name: &str) -> Self {
        Self::single_response(format!(
            "<answer>\n```json\n{{\"agentName\": \"{agent_name}\"}}\n```\n</answer>"
        ))
    }

    /// Every conversation this client was called with
    pub async fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn call(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ModelClientError> {
        self.received.lock().await.push(messages.to_vec());

        if self.should_fail {
            return Err(ModelClientError::NetworkError(
                "Mock model failure".to_string(),
            ));
        }

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.responses.len().max(1);
        *current += 1;

        match self.responses.get(response_idx) {
            Some(content) => Ok(ChatMessage::assistant(content.clone())),
            None => Err(ModelClientError::EmptyResponse),
        }
    }
}

/// Model client that answers based on keywords in the last user message
///
/// The first rule whose keyword occurs (case-insensitively) wins; without a
/// match it answers with an agent name nobody registered.
#[derive(Debug, Default)]
pub struct KeywordModelClient {
    rules: Vec<(String, String)>,
}

impl KeywordModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<K: Into<String>, A: Into<String>>(mut self, keyword: K, agent_name: A) -> Self {
        self.rules
            .push((keyword.into().to_lowercase(), agent_name.into()));
        self
    }
}

#[async_trait]
impl ModelClient for KeywordModelClient {
    async fn call(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ModelClientError> {
        let input = messages
            .iter()
            .rev()
            .find(|message| matches!(message, ChatMessage::User(_)))
            .map(|message| message.content().to_lowercase())
            .unwrap_or_default();

        let agent_name = self
            .rules
            .iter()
            .find(|(keyword, _)| input.contains(keyword.as_str()))
            .map(|(_, agent)| agent.as_str())
            .unwrap_or("unknown-agent");

        Ok(ChatMessage::assistant(format!(
            "{{\"agentName\": \"{agent_name}\"}}"
        )))
    }
}

/// Embedding client backed by a fixed text → vector table
///
/// Unknown text is an [`EmbeddingError::InvalidResponse`].
#[derive(Debug, Clone, Default)]
pub struct LookupEmbeddingClient {
    vectors: HashMap<String, Vec<f64>>,
}

impl LookupEmbeddingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<String>>(mut self, text: S, vector: Vec<f64>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingClient for LookupEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::InvalidResponse(format!("no vector for '{text}'")))
    }
}

/// Filter that always fails
#[derive(Debug, Clone)]
pub struct FailingSpecFilter {
    pub message: String,
}

impl FailingSpecFilter {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl SpecFilter for FailingSpecFilter {
    fn filter(&self, _specs: AgentSpecSet) -> Result<AgentSpecSet, FilterError> {
        Err(FilterError::new(self.message.clone()))
    }
}

/// Minimal valid spec: version 1.0.0, one http address
pub fn spec_named(name: &str) -> AgentRoutingSpec {
    AgentRoutingSpec {
        name: name.to_string(),
        description: format!("{name} description"),
        version: "1.0.0".to_string(),
        capabilities: Default::default(),
        addresses: [Address::new(format!("http://{name}"))].into_iter().collect(),
    }
}

/// The offer/order pair used in end-to-end scenarios
pub fn offer_and_order_specs() -> Vec<AgentRoutingSpec> {
    let offer = AgentRoutingSpec {
        name: "offer-agent".to_string(),
        description: "Helps customers find and buy new phones, contracts and offers".to_string(),
        version: "1.0.0".to_string(),
        capabilities: [
            Capability::new("view-offers", "Lists current phone and contract offers", "1.0.0"),
            Capability::new("buy-phone", "Helps the customer purchase a new phone", "1.0.0"),
        ]
        .into_iter()
        .collect(),
        addresses: [Address::new("http://offer-agent:8080")].into_iter().collect(),
    };
    let order = AgentRoutingSpec {
        name: "order-agent".to_string(),
        description: "Tracks existing orders and delivery status".to_string(),
        version: "1.0.0".to_string(),
        capabilities: [Capability::new(
            "order-status",
            "Reports the status of an existing order",
            "1.0.0",
        )]
        .into_iter()
        .collect(),
        addresses: [Address::new("http://order-agent:8080")].into_iter().collect(),
    };
    vec![offer, order]
}
