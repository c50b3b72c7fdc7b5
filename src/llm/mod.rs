//! Chat-completion models used for summaries and answers.

mod openai;

pub use openai::OpenAIChat;

use crate::error::Result;
use async_trait::async_trait;

/// Sampling temperature for every call.
pub const TEMPERATURE: f32 = 0.1;

/// Trait for chat-completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send an optional system message and one user message, returning the reply text.
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
