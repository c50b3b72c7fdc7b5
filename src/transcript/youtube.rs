//! YouTube caption fetching.

use super::{TranscriptSegment, TranscriptSource};
use crate::error::{Result, TubesageError};
use async_trait::async_trait;
use tracing::{debug, instrument};
use yt_transcript_rs::api::YouTubeTranscriptApi;

/// Fetches captions straight from YouTube (no API key needed).
pub struct YoutubeTranscripts {
    api: YouTubeTranscriptApi,
    languages: Vec<String>,
}

impl YoutubeTranscripts {
    /// Create a fetcher that prefers the given languages, in order.
    pub fn new(languages: &[String]) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None).map_err(|e| {
            TubesageError::Transcript(format!("Failed to initialize transcript client: {}", e))
        })?;

        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages.to_vec()
        };

        Ok(Self { api, languages })
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscripts {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        let transcript = self
            .api
            .fetch_transcript(video_id, &languages, false)
            .await
            .map_err(|e| TubesageError::Transcript(format!("{}: {}", video_id, e)))?;

        debug!(
            "Fetched {} caption segments for {}",
            transcript.snippets.len(),
            video_id
        );

        Ok(transcript
            .snippets
            .into_iter()
            .map(|s| TranscriptSegment::new(s.text, s.start, s.duration))
            .collect())
    }
}
