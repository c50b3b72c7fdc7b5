//! CLI module for Tubesage.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{mask_secret, Output};

use clap::{Parser, Subcommand};

/// Tubesage - summarize YouTube videos and ask questions about them
///
/// Fetches transcripts, stores video and chunk summaries with embeddings,
/// and answers questions from the closest chunks.
#[derive(Parser, Debug)]
#[command(name = "tubesage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check API keys, storage backend and configuration
    Doctor,

    /// Summarize and store one or more videos
    Process {
        /// YouTube video IDs or URLs
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Summarize and store the videos of a channel
    Channel {
        /// YouTube channel ID
        channel_id: String,

        /// Process at most this many videos (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Ask a question about the stored videos
    Ask {
        /// The question to ask
        question: String,

        /// Only search chunks of this video
        #[arg(long)]
        video: Option<String>,

        /// Drop chunks at or above this cosine distance
        #[arg(short, long, conflicts_with = "no_threshold")]
        threshold: Option<f32>,

        /// Use the nearest chunks regardless of distance
        #[arg(long)]
        no_threshold: bool,
    },

    /// Start an interactive question session
    Chat {
        /// Only search chunks of this video
        #[arg(long)]
        video: Option<String>,
    },

    /// List stored videos, or their chunks
    List {
        /// Show chunk rows instead of video rows
        #[arg(long)]
        chunks: bool,

        /// Only show this video
        #[arg(long)]
        video: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (keys masked)
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "rag.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

/// Distance threshold for a question: `--no-threshold` wins, then `--threshold`, then config.
pub fn resolve_threshold(flag: Option<f32>, no_threshold: bool, configured: Option<f32>) -> Option<f32> {
    if no_threshold {
        None
    } else {
        flag.or(configured)
    }
}
