//! Answer generation over retrieved chunks.

use super::context::{format_context_for_prompt, Reference};
use super::MAX_REFERENCES;
use crate::config::{Prompts, TOPIC_NOT_FOUND};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::llm::ChatModel;
use crate::vector_store::VectorStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Per-question retrieval options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Restrict retrieval to one video.
    pub video_filter: Option<String>,
    /// Drop candidates whose distance is at or above this value.
    pub distance_threshold: Option<f32>,
}

/// An answer with the chunks it was based on.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Raw model reply, sentinel included if present.
    pub answer: String,
    pub references: Vec<Reference>,
    /// False when the model reported that the context does not cover the question.
    pub topic_found: bool,
}

impl QueryResponse {
    /// The answer with the sentinel removed.
    pub fn display_answer(&self) -> String {
        self.answer.replace(TOPIC_NOT_FOUND, "").trim().to_string()
    }
}

/// Embeds questions, retrieves chunks and asks the chat model.
pub struct QueryEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
    max_results: usize,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        prompts: Prompts,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            prompts,
            max_results: MAX_REFERENCES,
        }
    }

    /// Use fewer context chunks; values above [`MAX_REFERENCES`] are capped.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_REFERENCES);
        self
    }

    /// Answer a single question.
    pub async fn ask(&self, question: &str, options: &QueryOptions) -> Result<QueryResponse> {
        self.ask_with_history(question, options, "").await
    }

    /// Answer a question, giving the model earlier turns of the conversation.
    #[instrument(skip(self, options, history), fields(question = %question))]
    pub async fn ask_with_history(
        &self,
        question: &str,
        options: &QueryOptions,
        history: &str,
    ) -> Result<QueryResponse> {
        info!("Processing question: {}", question);

        let references = self.retrieve(question, options).await?;
        let context = format_context_for_prompt(&references);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);
        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let system = if history.is_empty() {
            self.prompts.rag.system.clone()
        } else {
            format!("{}\n\nConversation so far:\n{}", self.prompts.rag.system, history)
        };

        let answer = self.chat.complete(Some(&system), &user_prompt).await?;
        let topic_found = !answer.contains(TOPIC_NOT_FOUND);
        debug!(
            "Answered with {} references (topic found: {})",
            references.len(),
            topic_found
        );

        Ok(QueryResponse {
            answer,
            references,
            topic_found,
        })
    }

    /// Nearest chunks to the question, thresholded and capped.
    async fn retrieve(&self, question: &str, options: &QueryOptions) -> Result<Vec<Reference>> {
        let embedding = self.embedder.embed(question).await?;
        let matches = self
            .store
            .search_chunks(&embedding, options.video_filter.as_deref(), self.max_results)
            .await?;

        let references: Vec<Reference> = matches
            .into_iter()
            .filter(|m| match options.distance_threshold {
                Some(threshold) => m.distance < threshold,
                None => true,
            })
            .take(self.max_results)
            .map(Reference::from)
            .collect();

        Ok(references)
    }
}
