//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{resolve_threshold, Output};
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::llm::OpenAIChat;
use crate::rag::{QueryEngine, QueryOptions};
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Build the query engine from settings.
pub(crate) fn build_engine(settings: &Settings, store: Arc<dyn VectorStore>) -> Result<QueryEngine> {
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    )?);
    let chat = Arc::new(OpenAIChat::new(&settings.rag.model)?);

    Ok(QueryEngine::new(store, embedder, chat, prompts).with_max_results(settings.rag.max_results))
}

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    video: Option<String>,
    threshold: Option<f32>,
    no_threshold: bool,
    settings: Settings,
    store: Arc<dyn VectorStore>,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubesage doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let engine = build_engine(&settings, store)?;
    let options = QueryOptions {
        video_filter: video,
        distance_threshold: resolve_threshold(threshold, no_threshold, settings.rag.distance_threshold),
    };

    let spinner = Output::spinner("Searching video summaries...");

    match engine.ask(question, &options).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.display_answer());

            if !response.topic_found {
                Output::warning("The stored videos do not seem to cover this question.");
            }

            if !response.references.is_empty() {
                Output::header("References");
                for reference in &response.references {
                    Output::reference(reference);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
