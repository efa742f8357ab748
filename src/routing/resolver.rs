//! The resolution contract shared by every strategy

use crate::error::ResolverResult;
use crate::llm::{ModelClient, ModelPromptProvider};
use crate::protocol::{build_conversation, Context, UserMessage};
use crate::registry::{AgentRoutingSpec, AgentRoutingSpecsProvider, AgentSpecSet, SpecFilter};
use async_trait::async_trait;
use tracing::trace;

/// Maps a conversation to the agent that should handle it
///
/// `Ok(None)` means no candidate matched; `Err` means the decision could not be
/// made at all. Callers must keep the two apart.
#[async_trait]
pub trait AgentRoutingSpecsResolver: Send + Sync {
    /// Resolve against the candidate set narrowed by `filters`, applied in order
    async fn resolve_with_filters(
        &self,
        filters: &[Box<dyn SpecFilter>],
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>>;

    /// Resolve against every registered agent
    async fn resolve(
        &self,
        context: &Context,
        input: &UserMessage,
    ) -> ResolverResult<Option<AgentRoutingSpec>> {
        self.resolve_with_filters(&[], context, input).await
    }
}

/// Exact-name lookup in the candidate set
pub(crate) fn find_spec(specs: &AgentSpecSet, name: &str) -> Option<AgentRoutingSpec> {
    specs.iter().find(|spec| spec.name == name).cloned()
}

/// Fetch candidates, build the routing conversation and call the model
///
/// Returns the candidate set together with the raw reply text.
pub(crate) async fn ask_model(
    provider: &dyn AgentRoutingSpecsProvider,
    prompt_provider: &dyn ModelPromptProvider,
    model_client: &dyn ModelClient,
    filters: &[Box<dyn SpecFilter>],
    context: &Context,
    input: &UserMessage,
) -> ResolverResult<(AgentSpecSet, String)> {
    let specs = provider.provide(filters)?;
    trace!(candidates = specs.len(), "Fetched agent specs");

    let prompt = prompt_provider.provide_prompt(context, &specs, input)?;
    let messages = build_conversation(prompt, context, input);

    trace!(messages = messages.len(), "Calling model");
    let reply = model_client.call(&messages).await?;
    Ok((specs, reply.into_content()))
}
