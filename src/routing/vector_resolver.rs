//! Similarity-driven resolution over seeded sample utterances

use crate::error::ResolverResult;
use crate::protocol::{Context, UserMessage};
use crate::registry::{AgentRoutingSpec, AgentRoutingSpecsProvider, SpecFilter};
use crate::resolve_span;
use crate::result::ResultExt;
use crate::routing::resolver::{find_spec, AgentRoutingSpecsResolver};
use crate::vector::{VectorSearchClient, VectorSearchClientRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, trace, Instrument};

pub struct VectorAgentRoutingSpecsResolver {
    provider: Arc<dyn AgentRoutingSpecsProvider>,
    search_client: Arc<dyn VectorSearchClient>,
}

impl VectorAgentRoutingSpecsResolver {
    pub fn new(
        provider: Arc<dyn AgentRoutingSpecsProvider>,
        search_client: Arc<dyn VectorSearchClient>,
    ) -> Self {
        Self {
            provider,
            search_client,
        }
    }

    async fn run(
        &self,
        filters: &[Box<dyn SpecFilter>],
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>> {
        let specs = self.provider.provide(filters)?;
        trace!(candidates = specs.len(), "Fetched agent specs");

        let request = VectorSearchClientRequest::new(input.content.clone(), context.clone());
        let found = self.search_client.find(&request, &specs).await?;

        Ok(found.and_then(|response| find_spec(&specs, &response.agent_name)))
    }
}

#[async_trait]
impl AgentRoutingSpecsResolver for VectorAgentRoutingSpecsResolver {
    async fn resolve_with_filters(
        &self,
        filters: &[Box<dyn SpecFilter>],
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>> {
        let span = resolve_span!(strategy = "vector", filters = filters.len());
        async {
            let resolved = self
                .run(filters, context, input)
                .await
                .on_failure(|e| error!("Failed to resolve agent spec: {}", e.sanitized_message()))?;

            match &resolved {
                Some(spec) => info!(agent = %spec.name, "Agent resolved"),
                None => info!("No matching agent among candidates"),
            }
            Ok(resolved)
        }
        .instrument(span)
        .await
    }
}
