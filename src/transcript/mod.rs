//! Transcript retrieval.
//!
//! A transcript is an ordered list of caption segments as delivered by the
//! transcript service; nothing here reorders or merges them.

mod youtube;

pub use youtube::YoutubeTranscripts;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single caption segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the ordered caption segments for a video.
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>>;
}
