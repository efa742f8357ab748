//! Conversation message types
//!
//! Chat messages exchanged with language models and the per-call conversation
//! context a caller supplies to a resolver.

pub mod messages;

pub use messages::*;
