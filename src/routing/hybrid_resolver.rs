//! Hybrid resolution: the model distills intent, vector search picks the agent
//!
//! The model reply is not parsed. It is handed to a
//! [`ModelToVectorQueryConverter`] together with the caller's context, and the
//! resulting query runs against the same filtered candidate set the prompt
//! listed.

use crate::error::ResolverResult;
use crate::llm::{DefaultModelPromptProvider, ModelClient, ModelPromptProvider};
use crate::protocol::{Context, UserMessage};
use crate::registry::{AgentRoutingSpec, AgentRoutingSpecsProvider, SpecFilter};
use crate::resolve_span;
use crate::result::ResultExt;
use crate::routing::query::{ModelToVectorQueryConverter, NoOpModelToVectorQueryConverter};
use crate::routing::resolver::{ask_model, find_spec, AgentRoutingSpecsResolver};
use crate::vector::VectorSearchClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, Instrument};

pub struct HybridAgentRoutingSpecsResolver {
    provider: Arc<dyn AgentRoutingSpecsProvider>,
    model_client: Arc<dyn ModelClient>,
    prompt_provider: Arc<dyn ModelPromptProvider>,
    search_client: Arc<dyn VectorSearchClient>,
    query_converter: Arc<dyn ModelToVectorQueryConverter>,
}

impl HybridAgentRoutingSpecsResolver {
    /// Resolver with the default prompt and a pass-through query converter
    pub fn new(
        provider: Arc<dyn AgentRoutingSpecsProvider>,
        model_client: Arc<dyn ModelClient>,
        search_client: Arc<dyn VectorSearchClient>,
    ) -> Self {
        Self {
            provider,
            model_client,
            prompt_provider: Arc::new(DefaultModelPromptProvider::new()),
            search_client,
            query_converter: Arc::new(NoOpModelToVectorQueryConverter),
        }
    }

    pub fn with_prompt_provider(mut self, prompt_provider: Arc<dyn ModelPromptProvider>) -> Self {
        self.prompt_provider = prompt_provider;
        self
    }

    pub fn with_query_converter(
        mut self,
        query_converter: Arc<dyn ModelToVectorQueryConverter>,
    ) -> Self {
        self.query_converter = query_converter;
        self
    }

    async fn run(
        &self,
        filters: &[Box<dyn SpecFilter>],
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>> {
        let (specs, reply) = ask_model(
            self.provider.as_ref(),
            self.prompt_provider.as_ref(),
            self.model_client.as_ref(),
            filters,
            context,
            input,
        )
        .await?;

        let request = self.query_converter.convert(&reply, context);
        debug!(query_len = request.query.len(), "Searching vectors with model reply");

        let found = self.search_client.find(&request, &specs).await?;
        Ok(found.and_then(|response| find_spec(&specs, &response.agent_name)))
    }
}

#[async_trait]
impl AgentRoutingSpecsResolver for HybridAgentRoutingSpecsResolver {
    async fn resolve_with_filters(
        &self,
        filters: &[Box<dyn SpecFilter>],
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>> {
        let span = resolve_span!(strategy = "hybrid", filters = filters.len());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use crate::protocol::ChatMessage;
    use crate::registry::{NameSpecFilter, SimpleAgentRoutingSpecsProvider};
    use crate::testing::{spec_named, LookupEmbeddingClient, MockModelClient};
    use crate::vector::{InMemoryVectorClient, VectorSearchClientRequest, VectorSeedClient, VectorSeedRequest};
    use std::sync::Mutex;

    async fn store() -> Arc<InMemoryVectorClient> {
        let embeddings = LookupEmbeddingClient::new()
            .with("buy phone", vec![1.0, 0.0])
            .with("order status", vec![0.0, 1.0])
            .with("customer wants to purchase a phone", vec![0.9, 0.1])
            .with("customer asks about an order", vec![0.1, 0.9]);
        let store = InMemoryVectorClient::new(Arc::new(embeddings));
        store
            .seed(&[
                VectorSeedRequest::new("offer-agent", "buy phone"),
                VectorSeedRequest::new("order-agent", "order status"),
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    fn provider() -> Arc<SimpleAgentRoutingSpecsProvider> {
        Arc::new(SimpleAgentRoutingSpecsProvider::with_specs([
            spec_named("offer-agent"),
            spec_named("order-agent"),
        ]))
    }

    /// Records what it was asked to convert
    #[derive(Default)]
    struct RecordingConverter {
        seen: Mutex<Vec<(String, Context)>>,
    }

    impl ModelToVectorQueryConverter for RecordingConverter {
        fn convert(&self, model_response: &str, context: &Context) -> VectorSearchClientRequest {
            self.seen
                .lock()
                .unwrap()
                .push((model_response.to_string(), context.clone()));
            VectorSearchClientRequest::new(model_response, context.clone())
        }
    }

    #[tokio::test]
    async fn test_model_reply_drives_vector_search() {
        let client = MockModelClient::single_response("customer wants to purchase a phone");
        let resolver = HybridAgentRoutingSpecsResolver::new(provider(), Arc::new(client), store().await);

        let spec = resolver
            .resolve(&Context::empty(), &UserMessage::new("I want to buy a new phone"))
            .await
            .unwrap();
        assert_eq!(spec.map(|s| s.name), Some("offer-agent".to_string()));
    }

    #[tokio::test]
    async fn test_filtered_path_uses_converter_with_original_context() {
        let converter = Arc::new(RecordingConverter::default());
        let client = MockModelClient::single_response("customer asks about an order");
        let resolver = HybridAgentRoutingSpecsResolver::new(provider(), Arc::new(client), store().await)
            .with_query_converter(converter.clone());

        let context = Context::new(vec![ChatMessage::user("Hi")]);
        let filters: Vec<Box<dyn SpecFilter>> = vec![Box::new(NameSpecFilter::new("order-agent"))];
        let spec = resolver
            .resolve_with_filters(&filters, &context, &UserMessage::new("Where is my order?"))
            .await
            .unwrap();

        assert_eq!(spec.map(|s| s.name), Some("order-agent".to_string()));
        let seen = converter.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "customer asks about an order");
        assert_eq!(seen[0].1, context);
    }

    #[tokio::test]
    async fn test_filters_restrict_vector_candidates() {
        let client = MockModelClient::single_response("customer wants to purchase a phone");
        let resolver = HybridAgentRoutingSpecsResolver::new(provider(), Arc::new(client), store().await);

        let filters: Vec<Box<dyn SpecFilter>> = vec![Box::new(NameSpecFilter::new("order-agent"))];
        let spec = resolver
            .resolve_with_filters(&filters, &Context::empty(), &UserMessage::new("buy"))
            .await
            .unwrap();
        // Only order-agent documents are ranked
        assert_eq!(spec.map(|s| s.name), Some("order-agent".to_string()));
    }

    #[tokio::test]
    async fn test_model_failure_is_wrapped() {
        let resolver = HybridAgentRoutingSpecsResolver::new(
            provider(),
            Arc::new(MockModelClient::with_failure()),
            store().await,
        );
        let error = resolver
            .resolve(&Context::empty(), &UserMessage::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(error, ResolverError::ModelClient(_)));
    }
}
