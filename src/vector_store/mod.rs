//! Storage for video and chunk summaries.
//!
//! Provides one trait-based interface over the configured backend: a document
//! collection keyed by string ids, or relational `videos` / `video_chunks` tables.

mod collection;
mod disabled;
mod relational;

pub use collection::CollectionStore;
pub use disabled::DisabledStore;
pub use relational::RelationalStore;

use crate::config::{Settings, StorageBackend};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Summary and embedding of a whole video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub length_seconds: i64,
    pub summary: String,
    pub embedding: Vec<f32>,
    pub processed_at: DateTime<Utc>,
}

/// Summary and embedding of one timed chunk of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub video_id: String,
    pub chunk_id: u32,
    /// Title of the parent video.
    pub title: String,
    pub summary: String,
    /// Chunk text as split from the transcript.
    pub content: String,
    pub embedding: Vec<f32>,
    pub start_time: f64,
    pub end_time: f64,
    pub url: String,
    pub processed_at: DateTime<Utc>,
}

/// Payload accepted by the storage write path.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryRecord {
    Video(VideoRecord),
    Chunk(ChunkRecord),
}

impl SummaryRecord {
    pub fn video_id(&self) -> &str {
        match self {
            SummaryRecord::Video(v) => &v.video_id,
            SummaryRecord::Chunk(c) => &c.video_id,
        }
    }

    /// Collection key: `{video_id}` for videos, `{video_id}_{chunk_id}` for chunks.
    pub fn key(&self) -> String {
        match self {
            SummaryRecord::Video(v) => v.video_id.clone(),
            SummaryRecord::Chunk(c) => chunk_key(&c.video_id, c.chunk_id),
        }
    }
}

pub(crate) fn chunk_key(video_id: &str, chunk_id: u32) -> String {
    format!("{}_{}", video_id, chunk_id)
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub record: ChunkRecord,
    /// Cosine distance to the query (lower is closer).
    pub distance: f32,
}

/// Trait for summary storage backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the active backend.
    fn backend(&self) -> &'static str;

    /// Insert or fully replace a record on its key.
    async fn upsert(&self, record: &SummaryRecord) -> Result<()>;

    /// Look up a processed video.
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>>;

    /// Look up one chunk of a video.
    async fn get_chunk(&self, video_id: &str, chunk_id: u32) -> Result<Option<ChunkRecord>>;

    /// Nearest chunks to `query_embedding`, closest first.
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        video_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>>;

    /// All stored videos, most recently processed first.
    async fn list_videos(&self) -> Result<Vec<VideoRecord>>;

    /// Stored chunks in video and chunk order.
    async fn list_chunks(&self, video_filter: Option<&str>) -> Result<Vec<ChunkRecord>>;
}

/// Open the store selected by `storage.backend`.
///
/// An unrecognized backend name yields a [`DisabledStore`].
pub fn create_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let name = settings.storage.backend.as_str();
    match name.parse::<StorageBackend>() {
        Ok(StorageBackend::Vector) => {
            let path = settings.vector_path();
            info!("Using vector collection at {:?}", path);
            Ok(Arc::new(CollectionStore::new(&path)?))
        }
        Ok(StorageBackend::Relational) => {
            let path = settings.relational_path()?;
            info!("Using relational database at {:?}", path);
            Ok(Arc::new(RelationalStore::new(&path)?))
        }
        Err(_) => {
            warn!("Unsupported storage backend '{}'; summaries will not be stored", name);
            Ok(Arc::new(DisabledStore::new(name)))
        }
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance, `1 - cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Score chunks against a query and keep the `limit` closest.
pub(crate) fn rank_chunks(
    query_embedding: &[f32],
    chunks: Vec<ChunkRecord>,
    limit: usize,
) -> Vec<ChunkMatch> {
    let mut matches: Vec<ChunkMatch> = chunks
        .into_iter()
        .map(|record| ChunkMatch {
            distance: cosine_distance(query_embedding, &record.embedding),
            record,
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(limit);
    matches
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` past the hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn video(video_id: &str, embedding: Vec<f32>) -> VideoRecord {
        VideoRecord {
            video_id: video_id.to_string(),
            title: format!("Title of {}", video_id),
            length_seconds: 600,
            summary: format!("Summary of {}", video_id),
            embedding,
            processed_at: Utc::now(),
        }
    }

    pub fn chunk(video_id: &str, chunk_id: u32, embedding: Vec<f32>) -> ChunkRecord {
        let start_time = chunk_id as f64 * 30.0;
        ChunkRecord {
            video_id: video_id.to_string(),
            chunk_id,
            title: format!("Title of {}", video_id),
            summary: format!("Chunk {} of {}", chunk_id, video_id),
            content: "so today we talk about ownership".to_string(),
            embedding,
            start_time,
            end_time: start_time + 32.5,
            url: crate::catalog::timestamp_url(video_id, start_time),
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert!((cosine_distance(&a, &c) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rank_chunks_orders_by_distance() {
        let chunks = vec![
            fixtures::chunk("v", 0, vec![0.0, 1.0]),
            fixtures::chunk("v", 1, vec![1.0, 0.0]),
            fixtures::chunk("v", 2, vec![1.0, 1.0]),
        ];
        let ranked = rank_chunks(&[1.0, 0.0], chunks, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].record.chunk_id, 1);
        assert_eq!(ranked[1].record.chunk_id, 2);
        assert!(ranked[0].distance <= ranked[1].distance);
    }

    #[test]
    fn test_record_keys() {
        let video = SummaryRecord::Video(fixtures::video("abc", vec![]));
        let chunk = SummaryRecord::Chunk(fixtures::chunk("abc", 4, vec![]));
        assert_eq!(video.key(), "abc");
        assert_eq!(chunk.key(), "abc_4");
        assert_eq!(chunk.video_id(), "abc");
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(125.0), "02:05");
        assert_eq!(format_timestamp(3725.9), "01:02:05");
    }

    #[test]
    fn test_embedding_bytes() {
        let v = vec![0.25, -1.5, 3.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)), v);
    }

    #[test]
    fn test_unknown_backend_is_disabled() {
        let mut settings = Settings::default();
        settings.storage.backend = "mongo".to_string();
        let store = create_store(&settings).unwrap();
        assert_eq!(store.backend(), "disabled");
    }
}
