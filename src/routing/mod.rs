//! Agent resolution strategies
//!
//! All strategies implement [`AgentRoutingSpecsResolver`]:
//!
//! - [`LlmAgentRoutingSpecsResolver`]: the model names an agent
//! - [`VectorAgentRoutingSpecsResolver`]: nearest seeded utterances vote
//! - [`HybridAgentRoutingSpecsResolver`]: the model's reply becomes the vector query

pub mod hybrid_resolver;
pub mod llm_resolver;
pub mod query;
pub mod resolver;
pub mod vector_resolver;

pub use hybrid_resolver::HybridAgentRoutingSpecsResolver;
pub use llm_resolver::LlmAgentRoutingSpecsResolver;
pub use query::{ModelToVectorQueryConverter, NoOpModelToVectorQueryConverter};
pub use resolver::AgentRoutingSpecsResolver;
pub use vector_resolver::VectorAgentRoutingSpecsResolver;
