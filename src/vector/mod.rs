//! Embedding-based agent search
//!
//! Documents are embedded once at seed time; queries are embedded per call and
//! ranked with [`cosine_similarity`].

pub mod embedding;
pub mod similarity;
pub mod store;

pub use embedding::*;
pub use similarity::cosine_similarity;
pub use store::*;
