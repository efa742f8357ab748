//! Concrete [`ModelClient`](crate::llm::ModelClient) backends

pub mod anthropic;
mod http;
pub mod openai;

pub use anthropic::*;
pub use openai::*;
