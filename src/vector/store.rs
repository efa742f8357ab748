//! In-memory vector search over seeded agent documents
//!
//! Each seeded document is a sample utterance labelled with the agent that
//! should handle it. A query is embedded, ranked by cosine similarity against
//! the candidate agents' documents, and the agent owning the most documents in
//! the top `limit` wins.

use crate::protocol::Context;
use crate::vector_span;
use crate::registry::AgentSpecSet;
use crate::vector::embedding::{EmbeddingClient, EmbeddingError};
use crate::vector::similarity::cosine_similarity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, Instrument};

/// Field name carrying the agent label in seed files and vector payloads
pub const AGENT_FIELD_NAME: &str = "agentName";

/// Default number of ranked documents that take part in the vote
pub const DEFAULT_LIMIT: usize = 5;

/// Vector search and seeding failures
#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Failed to embed text: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Failed to read seed file {path}: {source}")]
    SeedFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse seed file {path}: {source}")]
    SeedParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Embedding backend returned {actual} vectors for {expected} texts")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("Embedding dimension {actual} does not match store dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// One labelled sample utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorSeedRequest {
    #[serde(rename = "agentName")]
    pub agent_name: String,
    pub text: String,
}

impl VectorSeedRequest {
    pub fn new<A: Into<String>, T: Into<String>>(agent_name: A, text: T) -> Self {
        Self {
            agent_name: agent_name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorSearchClientRequest {
    pub query: String,
    pub context: Context,
}

impl VectorSearchClientRequest {
    pub fn new<S: Into<String>>(query: S, context: Context) -> Self {
        Self {
            query: query.into(),
            context,
        }
    }
}

/// Winning document: its text and the agent it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorSearchClientResponse {
    pub text: String,
    pub agent_name: String,
}

#[async_trait]
pub trait VectorSearchClient: Send + Sync {
    /// Pick an agent among `specs` for the request's query, or `None` when no
    /// stored document belongs to a candidate
    async fn find(
        &self,
        request: &VectorSearchClientRequest,
        specs: &AgentSpecSet,
    ) -> Result<Option<VectorSearchClientResponse>, VectorError>;
}

#[async_trait]
pub trait VectorSeedClient: Send + Sync {
    async fn seed(&self, documents: &[VectorSeedRequest]) -> Result<(), VectorError>;
}

#[derive(Debug, Clone)]
struct VectorDocument {
    text: String,
    vector: Vec<f64>,
    agent_name: String,
}

/// Append-only document store searched by brute-force cosine ranking
pub struct InMemoryVectorClient {
    embedding_client: Arc<dyn EmbeddingClient>,
    documents: RwLock<Vec<VectorDocument>>,
    limit: usize,
}

impl InMemoryVectorClient {
    pub fn new(embedding_client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embedding_client,
            documents: RwLock::new(Vec::new()),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Set how many top-ranked documents vote; zero is treated as one
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Seed from a JSON array of `{"agentName": ..., "text": ...}` objects
    pub async fn seed_from_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, VectorError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| VectorError::SeedFile {
                path: path.to_path_buf(),
                source,
            })?;
        let requests: Vec<VectorSeedRequest> =
            serde_json::from_str(&content).map_err(|source| VectorError::SeedParse {
                path: path.to_path_buf(),
                source,
            })?;

        self.seed(&requests).await?;
        info!(
            path = %path.display(),
            documents = requests.len(),
            "Seeded vector store from file"
        );
        Ok(requests.len())
    }
}

fn check_dimension(expected: Option<usize>, vector: &[f64]) -> Result<(), VectorError> {
    match expected {
        Some(expected) if expected != vector.len() => Err(VectorError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(()),
    }
}

/// Majority vote over an already ranked window
///
/// Returns the index (into `ranked`) of the winning agent's best document.
/// Ties go to the agent that appears first in the ranking.
fn majority_vote(ranked: &[&VectorDocument]) -> Option<usize> {
    // (agent, votes, index of its first document)
    let mut tally: Vec<(&str, usize, usize)> = Vec::new();
    for (index, document) in ranked.iter().enumerate() {
        match tally
            .iter_mut()
            .find(|(agent, _, _)| *agent == document.agent_name)
        {
            Some(entry) => entry.1 += 1,
            None => tally.push((document.agent_name.as_str(), 1, index)),
        }
    }

    let mut winner: Option<(usize, usize)> = None;
    for (_, votes, first_index) in tally {
        if winner.map_or(true, |(best_votes, _)| votes > best_votes) {
            winner = Some((votes, first_index));
        }
    }
    winner.map(|(_, first_index)| first_index)
}

#[async_trait]
impl VectorSearchClient for InMemoryVectorClient {
    async fn find(
        &self,
        request: &VectorSearchClientRequest,
        specs: &AgentSpecSet,
    ) -> Result<Option<VectorSearchClientResponse>, VectorError> {
        let span = vector_span!(operation = "find", limit = self.limit);
        self.rank_and_vote(request, specs).instrument(span).await
    }
}

#[async_trait]
impl VectorSeedClient for InMemoryVectorClient {
    async fn seed(&self, documents: &[VectorSeedRequest]) -> Result<(), VectorError> {
        let span = vector_span!(operation = "seed", documents = documents.len());
        self.embed_and_store(documents).instrument(span).await
    }
}

impl InMemoryVectorClient {
    async fn rank_and_vote(
        &self,
        request: &VectorSearchClientRequest,
        specs: &AgentSpecSet,
    ) -> Result<Option<VectorSearchClientResponse>, VectorError> {
        let candidates: HashSet<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
        let query = self.embedding_client.embed(&request.query).await?;

        let documents = self.documents.read().await;
        check_dimension(documents.first().map(|d| d.vector.len()), &query)?;

        let mut scored: Vec<(f64, &VectorDocument)> = documents
            .iter()
            .filter(|document| candidates.contains(document.agent_name.as_str()))
            .map(|document| (cosine_similarity(&query, &document.vector), document))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let ranked: Vec<&VectorDocument> = scored
            .into_iter()
            .take(self.limit)
            .map(|(_, document)| document)
            .collect();
        debug!(
            candidates = candidates.len(),
            ranked = ranked.len(),
            "Ranked vector documents"
        );

        Ok(majority_vote(&ranked).map(|index| VectorSearchClientResponse {
            text: ranked[index].text.clone(),
            agent_name: ranked[index].agent_name.clone(),
        }))
    }

    async fn embed_and_store(&self, documents: &[VectorSeedRequest]) -> Result<(), VectorError> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = self.embedding_client.batch_embed(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(VectorError::EmbeddingCountMismatch {
                expected: documents.len(),
                actual: embeddings.len(),
            });
        }

        // Validate the whole batch before touching the store
        let mut store = self.documents.write().await;
        let dimension = store
            .first()
            .map(|d| d.vector.len())
            .or_else(|| embeddings.first().map(Vec::len));
        for embedding in &embeddings {
            check_dimension(dimension, embedding)?;
        }

        store.extend(
            documents
                .iter()
                .zip(embeddings)
                .map(|(request, vector)| VectorDocument {
                    text: request.text.clone(),
                    vector,
                    agent_name: request.agent_name.clone(),
                }),
        );
        debug!(added = documents.len(), total = store.len(), "Seeded vector documents");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spec_named, LookupEmbeddingClient};
    use std::io::Write;

    fn specs(names: &[&str]) -> AgentSpecSet {
        names.iter().map(|name| spec_named(name)).collect()
    }

    fn request(query: &str) -> VectorSearchClientRequest {
        VectorSearchClientRequest::new(query, Context::empty())
    }

    #[tokio::test]
    async fn test_empty_store_finds_nothing() {
        let embeddings = LookupEmbeddingClient::new().with("query", vec![1.0, 0.0]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings));

        let result = client.find(&request("query"), &specs(&["agentA"])).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_majority_beats_single_best_match() {
        let embeddings = LookupEmbeddingClient::new()
            .with("query", vec![1.0, 0.0])
            .with("b-best", vec![1.0, 0.0])
            .with("a-one", vec![0.9, 0.1])
            .with("a-two", vec![0.8, 0.2]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings)).with_limit(3);
        client
            .seed(&[
                VectorSeedRequest::new("agentB", "b-best"),
                VectorSeedRequest::new("agentA", "a-one"),
                VectorSeedRequest::new("agentA", "a-two"),
            ])
            .await
            .unwrap();

        let result = client
            .find(&request("query"), &specs(&["agentA", "agentB"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.agent_name, "agentA");
        assert_eq!(result.text, "a-one");
    }

    #[tokio::test]
    async fn test_limit_bounds_the_vote() {
        let embeddings = LookupEmbeddingClient::new()
            .with("query", vec![1.0, 0.0])
            .with("b-best", vec![1.0, 0.0])
            .with("a-one", vec![0.9, 0.1])
            .with("a-two", vec![0.8, 0.2]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings)).with_limit(1);
        client
            .seed(&[
                VectorSeedRequest::new("agentA", "a-one"),
                VectorSeedRequest::new("agentA", "a-two"),
                VectorSeedRequest::new("agentB", "b-best"),
            ])
            .await
            .unwrap();

        let result = client
            .find(&request("query"), &specs(&["agentA", "agentB"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.agent_name, "agentB");
    }

    #[tokio::test]
    async fn test_tie_goes_to_first_ranked_agent() {
        let embeddings = LookupEmbeddingClient::new()
            .with("query", vec![1.0, 0.0])
            .with("a-low", vec![0.5, 0.5])
            .with("b-high", vec![0.9, 0.1]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings));
        client
            .seed(&[
                VectorSeedRequest::new("agentA", "a-low"),
                VectorSeedRequest::new("agentB", "b-high"),
            ])
            .await
            .unwrap();

        let result = client
            .find(&request("query"), &specs(&["agentA", "agentB"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.agent_name, "agentB");
    }

    #[tokio::test]
    async fn test_non_candidates_are_ignored() {
        let embeddings = LookupEmbeddingClient::new()
            .with("query", vec![1.0, 0.0])
            .with("a", vec![1.0, 0.0]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings));
        client
            .seed(&[VectorSeedRequest::new("agentA", "a")])
            .await
            .unwrap();

        let result = client.find(&request("query"), &specs(&["agentB"])).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_failed_seed_leaves_store_untouched() {
        let embeddings = LookupEmbeddingClient::new().with("known", vec![1.0, 0.0]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings));

        let error = client
            .seed(&[
                VectorSeedRequest::new("agentA", "known"),
                VectorSeedRequest::new("agentA", "unknown"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(error, VectorError::Embedding(_)));
        assert!(client.is_empty().await);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let embeddings = LookupEmbeddingClient::new()
            .with("two", vec![1.0, 0.0])
            .with("three", vec![1.0, 0.0, 0.0]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings));
        client
            .seed(&[VectorSeedRequest::new("agentA", "two")])
            .await
            .unwrap();

        let error = client
            .seed(&[VectorSeedRequest::new("agentA", "three")])
            .await
            .unwrap_err();
        assert!(matches!(error, VectorError::DimensionMismatch { expected: 2, actual: 3 }));

        let error = client
            .find(&request("three"), &specs(&["agentA"]))
            .await
            .unwrap_err();
        assert!(matches!(error, VectorError::DimensionMismatch { .. }));
        assert_eq!(client.len().await, 1);
    }

    #[tokio::test]
    async fn test_seed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"agentName": "offer-agent", "text": "buy phone"}}, {{"agentName": "order-agent", "text": "order status"}}]"#
        )
        .unwrap();

        let embeddings = LookupEmbeddingClient::new()
            .with("buy phone", vec![1.0, 0.0])
            .with("order status", vec![0.0, 1.0]);
        let client = InMemoryVectorClient::new(Arc::new(embeddings));

        assert_eq!(client.seed_from_file(file.path()).await.unwrap(), 2);
        assert_eq!(client.len().await, 2);
    }

    #[tokio::test]
    async fn test_seed_from_missing_or_malformed_file() {
        let client = InMemoryVectorClient::new(Arc::new(LookupEmbeddingClient::new()));
        assert!(matches!(
            client.seed_from_file("/nonexistent/seed.json").await,
            Err(VectorError::SeedFile { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"text": "no agent"}}]"#).unwrap();
        assert!(matches!(
            client.seed_from_file(file.path()).await,
            Err(VectorError::SeedParse { .. })
        ));
    }

    #[test]
    fn test_seed_request_uses_agent_field_name() {
        let json = serde_json::to_value(VectorSeedRequest::new("a", "t")).unwrap();
        assert!(json.get(AGENT_FIELD_NAME).is_some());
    }
}
