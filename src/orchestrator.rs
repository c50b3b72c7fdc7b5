//! Video processing pipeline.
//!
//! Coordinates the whole path from video ID to stored summaries:
//! details, transcript, merge, split, summarize, embed, store.

use crate::catalog::{timestamp_url, VideoCatalog, YoutubeDataApi};
use crate::chunking::{merge_segments, split_with_timestamps, ChunkingConfig, TimedChunk};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TubesageError};
use crate::llm::{ChatModel, OpenAIChat};
use crate::summarize::Summarizer;
use crate::transcript::{TranscriptSource, YoutubeTranscripts};
use crate::vector_store::{ChunkRecord, SummaryRecord, VectorStore, VideoRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// The main pipeline for turning videos into stored summaries.
pub struct Pipeline {
    catalog: Arc<dyn VideoCatalog>,
    transcripts: Arc<dyn TranscriptSource>,
    summarizer: Summarizer,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunking: ChunkingConfig,
}

impl Pipeline {
    /// Create a pipeline backed by YouTube and OpenAI.
    pub fn new(settings: &Settings, store: Arc<dyn VectorStore>) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let api_key = settings.youtube.api_key.as_deref().ok_or_else(|| {
            TubesageError::Config("YOUTUBE_API_KEY is not set".to_string())
        })?;
        let catalog = YoutubeDataApi::new(api_key)?
            .with_page_size(settings.youtube.page_size)
            .with_event_type(settings.youtube.event_type.clone());

        let transcripts = YoutubeTranscripts::new(&settings.youtube.transcript_languages)?;
        let chat = OpenAIChat::new(&settings.summary.model)?;
        let embedder = OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?;

        Ok(Self::with_components(
            settings,
            prompts,
            Arc::new(catalog),
            Arc::new(transcripts),
            Arc::new(chat),
            Arc::new(embedder),
            store,
        ))
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: &Settings,
        prompts: Prompts,
        catalog: Arc<dyn VideoCatalog>,
        transcripts: Arc<dyn TranscriptSource>,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            catalog,
            transcripts,
            summarizer: Summarizer::new(chat, prompts, settings.summary.map_chunk_size),
            embedder,
            store,
            chunking: ChunkingConfig::from(&settings.chunking),
        }
    }

    /// Get a reference to the store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Process one video. Already stored videos are skipped without any external call.
    #[instrument(skip(self))]
    pub async fn process_video(&self, video_id: &str) -> Result<ProcessOutcome> {
        if self.store.get_video(video_id).await?.is_some() {
            info!("Video {} is already processed", video_id);
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        let details = self.catalog.video_details(video_id).await?;
        info!(
            "Processing video {} '{}' ({:.0}s)",
            video_id, details.title, details.length_seconds
        );

        let segments = self.transcripts.fetch(video_id).await?;
        if segments.is_empty() {
            return Err(TubesageError::Transcript(format!(
                "{} has an empty transcript",
                video_id
            )));
        }

        let (full_text, spans) = merge_segments(&segments);
        let chunks = split_with_timestamps(&full_text, &spans, &self.chunking)?;
        if chunks.is_empty() {
            return Err(TubesageError::Chunking(format!(
                "{} produced no chunks",
                video_id
            )));
        }
        info!("Split transcript into {} chunks", chunks.len());

        let summary = self.summarizer.summarize_video(&full_text).await?;
        let embedding = self.embedder.embed(&summary).await?;

        let mut report = ProcessReport {
            video_id: video_id.to_string(),
            title: details.title.clone(),
            chunks_stored: 0,
            chunks_skipped: 0,
        };

        for (chunk_id, chunk) in chunks.iter().enumerate() {
            let record = match self
                .chunk_record(video_id, &details.title, chunk_id as u32, chunk)
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping chunk {} of {}: {}", chunk_id, video_id, e);
                    report.chunks_skipped += 1;
                    continue;
                }
            };
            self.store.upsert(&SummaryRecord::Chunk(record)).await?;
            report.chunks_stored += 1;
        }

        if report.chunks_stored == 0 {
            return Err(TubesageError::Chunking(format!(
                "none of the {} chunks of {} could be summarized",
                chunks.len(),
                video_id
            )));
        }

        // The video row marks the video as processed, so it goes in last.
        self.store
            .upsert(&SummaryRecord::Video(VideoRecord {
                video_id: video_id.to_string(),
                title: details.title.clone(),
                length_seconds: details.length_seconds as i64,
                summary,
                embedding,
                processed_at: Utc::now(),
            }))
            .await?;

        info!(
            "Stored {} chunks for {} ({} skipped)",
            report.chunks_stored, video_id, report.chunks_skipped
        );
        Ok(ProcessOutcome::Processed(report))
    }

    /// Summarize and embed one chunk.
    async fn chunk_record(
        &self,
        video_id: &str,
        title: &str,
        chunk_id: u32,
        chunk: &TimedChunk,
    ) -> Result<ChunkRecord> {
        let summary = self.summarizer.summarize_chunk(&chunk.text).await?;
        let embedding = self.embedder.embed(&summary).await?;

        Ok(ChunkRecord {
            video_id: video_id.to_string(),
            chunk_id,
            title: title.to_string(),
            summary,
            content: chunk.text.clone(),
            embedding,
            start_time: chunk.start,
            end_time: chunk.end(),
            url: timestamp_url(video_id, chunk.start),
            processed_at: Utc::now(),
        })
    }

    /// Process videos one after another; a failed video does not stop the batch.
    pub async fn process_batch(&self, video_ids: &[String]) -> BatchReport {
        self.process_batch_with(video_ids, |_| {}).await
    }

    /// Like [`Pipeline::process_batch`], calling `on_done` with each video ID once it is finished.
    pub async fn process_batch_with<F>(&self, video_ids: &[String], mut on_done: F) -> BatchReport
    where
        F: FnMut(&str),
    {
        let mut batch = BatchReport::default();

        for video_id in video_ids {
            match self.process_video(video_id).await {
                Ok(ProcessOutcome::Processed(report)) => batch.processed.push(report),
                Ok(ProcessOutcome::AlreadyProcessed) => batch.already_processed.push(video_id.clone()),
                Err(e) => {
                    error!("Failed to process {}: {}", video_id, e);
                    batch.failed.push((video_id.clone(), e.to_string()));
                }
            }
            on_done(video_id);
        }

        batch
    }

    /// Process the videos of a channel, optionally only the first `limit`.
    #[instrument(skip(self))]
    pub async fn process_channel(&self, channel_id: &str, limit: Option<usize>) -> Result<BatchReport> {
        let videos = self.catalog.list_channel_videos(channel_id).await?;
        info!("Channel {} lists {} videos", channel_id, videos.len());

        let ids: Vec<String> = videos
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|v| v.id)
            .collect();

        Ok(self.process_batch(&ids).await)
    }
}

/// Result of processing one video.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// The video and its chunks were stored.
    Processed(ProcessReport),
    /// The video was already stored; nothing was fetched.
    AlreadyProcessed,
}

/// Counts for a processed video.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub video_id: String,
    pub title: String,
    pub chunks_stored: usize,
    /// Chunks whose summary or embedding failed.
    pub chunks_skipped: usize,
}

/// Outcome of a batch of videos.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessReport>,
    pub already_processed: Vec<String>,
    /// Video ID and error message.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.already_processed.len() + self.failed.len()
    }
}
