//! Tubesage - YouTube transcript summaries and question answering
//!
//! A CLI tool that turns YouTube videos into searchable summaries and answers
//! questions about them with retrieval-augmented generation.
//!
//! # Overview
//!
//! Tubesage allows you to:
//! - Fetch video details and captions for single videos or whole channels
//! - Summarize each video and each timed chunk of its transcript
//! - Store summaries with embeddings in a vector collection or relational tables
//! - Ask questions and get answers that link back to the exact moment in a video
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `catalog` - Video details and channel listings
//! - `transcript` - Caption fetching
//! - `chunking` - Transcript merging and timed chunking
//! - `llm` / `summarize` - Chat models and map-reduce summaries
//! - `embedding` - Embedding generation
//! - `vector_store` - Storage backends
//! - `rag` - Question answering
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tubesage::config::Settings;
//! use tubesage::orchestrator::{Pipeline, ProcessOutcome};
//! use tubesage::vector_store::create_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut settings = Settings::load()?;
//!     settings.apply_env();
//!     let store = create_store(&settings)?;
//!     let pipeline = Pipeline::new(&settings, store)?;
//!
//!     if let ProcessOutcome::Processed(report) = pipeline.process_video("dQw4w9WgXcQ").await? {
//!         println!("Stored {} chunks", report.chunks_stored);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod summarize;
pub mod transcript;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TubesageError};
