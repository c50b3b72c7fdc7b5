//! Configuration module for Tubesage.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts, SummaryPrompts, TOPIC_NOT_FOUND};
pub use settings::{
    ChunkingSettings, DurationRule, EmbeddingSettings, GeneralSettings, PromptSettings,
    RagSettings, Settings, StorageBackend, StorageSettings, SummarySettings, YoutubeSettings,
};
