//! Model-driven resolution
//!
//! The model sees the candidate agents in its system prompt and names one. The
//! named agent is then looked up in the same candidate set, so the model can
//! never route to an agent outside it.

use crate::error::{ResolverError, ResolverResult};
use crate::llm::{
    DefaultModelClientResponseProcessor, DefaultModelPromptProvider, ModelClient,
    ModelClientResponse, ModelClientResponseProcessor, ModelPromptProvider,
};
use crate::protocol::{Context, UserMessage};
use crate::registry::{AgentRoutingSpec, AgentRoutingSpecsProvider, SpecFilter};
use crate::resolve_span;
use crate::result::ResultExt;
use crate::routing::resolver::{ask_model, find_spec, AgentRoutingSpecsResolver};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, Instrument};

pub struct LlmAgentRoutingSpecsResolver {
    provider: Arc<dyn AgentRoutingSpecsProvider>,
    model_client: Arc<dyn ModelClient>,
    prompt_provider: Arc<dyn ModelPromptProvider>,
    response_processor: Arc<dyn ModelClientResponseProcessor>,
}

impl LlmAgentRoutingSpecsResolver {
    /// Resolver with the default prompt and response processor
    pub fn new(
        provider: Arc<dyn AgentRoutingSpecsProvider>,
        model_client: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            provider,
            model_client,
            prompt_provider: Arc::new(DefaultModelPromptProvider::new()),
            response_processor: Arc::new(DefaultModelClientResponseProcessor),
        }
    }

    pub fn with_prompt_provider(mut self, prompt_provider: Arc<dyn ModelPromptProvider>) -> Self {
        self.prompt_provider = prompt_provider;
        self
    }

    pub fn with_response_processor(
        mut self,
        response_processor: Arc<dyn ModelClientResponseProcessor>,
    ) -> Self {
        self.response_processor = response_processor;
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

        let processed = self.response_processor.process(&reply);
        let answer: ModelClientResponse =
            serde_json::from_str(&processed).map_err(|source| {
                ResolverError::InvalidModelResponse {
                    response: processed.clone(),
                    source,
                }
            })?;
        debug!(agent_name = %answer.agent_name, "Model named an agent");

        Ok(find_spec(&specs, &answer.agent_name))
    }
}

#[async_trait]
impl AgentRoutingSpecsResolver for LlmAgentRoutingSpecsResolver {
    async fn resolve_with_filters(
        &self,
        filters: &[Box<dyn SpecFilter>],
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>> {
        let span = resolve_span!(strategy = "llm", filters = filters.len());
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
