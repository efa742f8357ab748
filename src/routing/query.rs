//! Turning a model reply into a vector search query

use crate::protocol::Context;
use crate::vector::VectorSearchClientRequest;

/// Derives the vector query from the model's free-text reply
pub trait ModelToVectorQueryConverter: Send + Sync {
    fn convert(&self, model_response: &str, context: &Context) -> VectorSearchClientRequest;
}

/// Uses the reply verbatim as the query
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpModelToVectorQueryConverter;

impl ModelToVectorQueryConverter for NoOpModelToVectorQueryConverter {
    fn convert(&self, model_response: &str, context: &Context) -> VectorSearchClientRequest {
        VectorSearchClientRequest::new(model_response, context.clone())
    }
}
