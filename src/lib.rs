//! Agent Router
//!
//! Routes a user utterance to the best-matching agent from a registry of
//! agent routing specs. Three strategies share one contract,
//! [`AgentRoutingSpecsResolver`]:
//!
//! - LLM: a language model reads the agent list and names an agent
//! - Vector: the utterance is embedded and seeded sample utterances vote
//! - Hybrid: the model's reply is used as the vector query
//!
//! A resolution either picks an agent (`Ok(Some(spec))`), finds no match
//! (`Ok(None)`) or fails (`Err(ResolverError)`).
//!
//! # Quick Start
//!
//! ```rust
//! use agent_router::protocol::{Context, UserMessage};
//! use agent_router::registry::SimpleAgentRoutingSpecsProvider;
//! use agent_router::routing::{AgentRoutingSpecsResolver, LlmAgentRoutingSpecsResolver};
//! use agent_router::testing::{offer_and_order_specs, MockModelClient};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let provider = Arc::new(SimpleAgentRoutingSpecsProvider::with_specs(offer_and_order_specs()));
//! let model = Arc::new(MockModelClient::answering("offer-agent"));
//! let resolver = LlmAgentRoutingSpecsResolver::new(provider, model);
//!
//! let spec = resolver
//!     .resolve(&Context::empty(), &UserMessage::new("I want to buy a new phone"))
//!     .await
//!     .unwrap();
//! assert_eq!(spec.unwrap().name, "offer-agent");
//! # });
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod protocol;
pub mod registry;
pub mod result;
pub mod routing;
pub mod testing;
pub mod vector;

pub use config::{ConfigError, RouterConfig};
pub use error::{ResolverError, ResolverResult};
pub use protocol::*;
pub use registry::{AgentRoutingSpec, AgentRoutingSpecsProvider, SpecFilter};
pub use routing::AgentRoutingSpecsResolver;
