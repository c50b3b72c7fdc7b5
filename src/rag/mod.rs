//! Question answering over stored chunk summaries.
//!
//! A question is embedded, matched against chunk embeddings, and the closest
//! chunks are handed to the chat model as context.

mod chat;
pub mod context;
mod response;

pub use chat::ChatSession;
pub use context::{format_references_for_display, Reference};
pub use response::{QueryEngine, QueryOptions, QueryResponse};

/// Upper bound on chunks used as context for one answer.
pub const MAX_REFERENCES: usize = 3;
