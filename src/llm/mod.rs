//! Language model access for routing
//!
//! [`ModelClient`] is the backend seam; [`ModelPromptProvider`] and
//! [`ModelClientResponseProcessor`] are the replaceable prompt conventions
//! around it.

pub mod client;
pub mod prompt;
pub mod providers;
pub mod response;

pub use client::*;
pub use prompt::*;
pub use providers::*;
pub use response::*;
