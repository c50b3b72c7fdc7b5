//! In-process stand-ins for the external services, used by unit tests.

use crate::catalog::{ChannelVideo, VideoCatalog, VideoDetails};
use crate::embedding::Embedder;
use crate::error::{Result, TubesageError};
use crate::llm::ChatModel;
use crate::transcript::{TranscriptSegment, TranscriptSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Embeds text as keyword counts over a fixed vocabulary.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&["x"])
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocabulary
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TubesageError::Embedding("embedding service down".to_string()));
        }
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Chat model that answers through a closure and records every prompt.
pub struct ScriptedChat {
    reply: Reply,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with a short line that records the prompt length.
    pub fn summarizing() -> Self {
        Self::new(|prompt| Ok(format!("summary of {} chars", prompt.len())))
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, _system: Option<&str>, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)(prompt)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Transcript source backed by a map; unknown videos have no captions.
#[derive(Default)]
pub struct StaticTranscripts {
    pub transcripts: HashMap<String, Vec<TranscriptSegment>>,
    pub calls: AtomicUsize,
}

impl StaticTranscripts {
    pub fn with(mut self, video_id: &str, segments: Vec<TranscriptSegment>) -> Self {
        self.transcripts.insert(video_id.to_string(), segments);
        self
    }
}

#[async_trait]
impl TranscriptSource for StaticTranscripts {
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transcripts
            .get(video_id)
            .cloned()
            .ok_or_else(|| TubesageError::Transcript(format!("{}: captions disabled", video_id)))
    }
}

/// Catalog with fixed details and channel listings.
#[derive(Default)]
pub struct StaticCatalog {
    pub details: HashMap<String, VideoDetails>,
    pub channels: HashMap<String, Vec<ChannelVideo>>,
    pub calls: AtomicUsize,
}

impl StaticCatalog {
    pub fn with_video(mut self, video_id: &str, title: &str, length_seconds: f64) -> Self {
        self.details.insert(
            video_id.to_string(),
            VideoDetails {
                video_id: video_id.to_string(),
                title: title.to_string(),
                length_seconds,
                channel: None,
                published_at: None,
            },
        );
        self
    }

    pub fn with_channel(mut self, channel_id: &str, videos: &[(&str, &str)]) -> Self {
        self.channels.insert(
            channel_id.to_string(),
            videos
                .iter()
                .map(|(id, title)| ChannelVideo {
                    id: id.to_string(),
                    title: title.to_string(),
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl VideoCatalog for StaticCatalog {
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .get(video_id)
            .cloned()
            .ok_or_else(|| TubesageError::VideoNotFound(video_id.to_string()))
    }

    async fn list_channel_videos(&self, channel_id: &str) -> Result<Vec<ChannelVideo>> {
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| TubesageError::VideoSource(format!("unknown channel {}", channel_id)))
    }
}
