//! Store used when the configured backend is not recognized.

use super::{ChunkMatch, ChunkRecord, SummaryRecord, VectorStore, VideoRecord};
use crate::error::Result;
use async_trait::async_trait;
use tracing::warn;

/// Accepts writes and drops them; reads find nothing.
pub struct DisabledStore {
    requested: String,
}

impl DisabledStore {
    pub fn new(requested: &str) -> Self {
        Self {
            requested: requested.to_string(),
        }
    }
}

#[async_trait]
impl VectorStore for DisabledStore {
    fn backend(&self) -> &'static str {
        "disabled"
    }

    async fn upsert(&self, record: &SummaryRecord) -> Result<()> {
        warn!(
            "Backend '{}' is not supported; not storing {}",
            self.requested,
            record.key()
        );
        Ok(())
    }

    async fn get_video(&self, _video_id: &str) -> Result<Option<VideoRecord>> {
        Ok(None)
    }

    async fn get_chunk(&self, _video_id: &str, _chunk_id: u32) -> Result<Option<ChunkRecord>> {
        Ok(None)
    }

    async fn search_chunks(
        &self,
        _query_embedding: &[f32],
        _video_filter: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<ChunkMatch>> {
        Ok(Vec::new())
    }

    async fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        Ok(Vec::new())
    }

    async fn list_chunks(&self, _video_filter: Option<&str>) -> Result<Vec<ChunkRecord>> {
        Ok(Vec::new())
    }
}
