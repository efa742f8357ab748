//! Agent registry model
//!
//! Agent routing specs, the filters that narrow a candidate set, and the
//! providers that supply candidate sets to resolvers.

pub mod filter;
pub mod model;
pub mod provider;

pub use filter::*;
pub use model::*;
pub use provider::*;
