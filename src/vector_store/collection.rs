//! Document-collection backend.
//!
//! Every record is one row of `(id, kind, video_id, document, metadata, embedding)`:
//! the document holds the summarized text, the metadata is a JSON object.
//! Similarity is computed in Rust over the stored embeddings.

use super::{
    bytes_to_embedding, chunk_key, embedding_to_bytes, parse_timestamp, rank_chunks, ChunkMatch,
    ChunkRecord, SummaryRecord, VectorStore, VideoRecord,
};
use crate::error::{Result, TubesageError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        video_id TEXT NOT NULL,
        document TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_video_id ON documents(video_id);
    CREATE INDEX IF NOT EXISTS idx_documents_kind ON documents(kind);
"#;

const KIND_VIDEO: &str = "video";
const KIND_CHUNK: &str = "chunk";

#[derive(Serialize, Deserialize)]
struct VideoMetadata {
    title: String,
    length_seconds: i64,
    processed_at: String,
}

#[derive(Serialize, Deserialize)]
struct ChunkMetadata {
    chunk_id: u32,
    title: String,
    summary: String,
    start_time: f64,
    end_time: f64,
    url: String,
    processed_at: String,
}

/// Collection of summary documents persisted in SQLite.
pub struct CollectionStore {
    conn: Mutex<Connection>,
}

impl CollectionStore {
    /// Open or create the collection at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened vector collection at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory collection (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubesageError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    fn write(conn: &Connection, record: &SummaryRecord) -> Result<()> {
        let (kind, document, metadata, embedding) = match record {
            SummaryRecord::Video(v) => (
                KIND_VIDEO,
                v.summary.as_str(),
                serde_json::to_string(&VideoMetadata {
                    title: v.title.clone(),
                    length_seconds: v.length_seconds,
                    processed_at: v.processed_at.to_rfc3339(),
                })?,
                &v.embedding,
            ),
            SummaryRecord::Chunk(c) => (
                KIND_CHUNK,
                c.content.as_str(),
                serde_json::to_string(&ChunkMetadata {
                    chunk_id: c.chunk_id,
                    title: c.title.clone(),
                    summary: c.summary.clone(),
                    start_time: c.start_time,
                    end_time: c.end_time,
                    url: c.url.clone(),
                    processed_at: c.processed_at.to_rfc3339(),
                })?,
                &c.embedding,
            ),
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT OR REPLACE INTO documents (id, kind, video_id, document, metadata, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.key(),
                kind,
                record.video_id(),
                document,
                metadata,
                embedding_to_bytes(embedding),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn raw_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, Vec<u8>)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn decode_video(
        (video_id, summary, metadata, embedding): (String, String, String, Vec<u8>),
    ) -> Result<VideoRecord> {
        let meta: VideoMetadata = serde_json::from_str(&metadata)?;
        Ok(VideoRecord {
            video_id,
            title: meta.title,
            length_seconds: meta.length_seconds,
            summary,
            embedding: bytes_to_embedding(&embedding),
            processed_at: parse_timestamp(&meta.processed_at),
        })
    }

    fn decode_chunk(
        (video_id, content, metadata, embedding): (String, String, String, Vec<u8>),
    ) -> Result<ChunkRecord> {
        let meta: ChunkMetadata = serde_json::from_str(&metadata)?;
        Ok(ChunkRecord {
            video_id,
            chunk_id: meta.chunk_id,
            title: meta.title,
            summary: meta.summary,
            content,
            embedding: bytes_to_embedding(&embedding),
            start_time: meta.start_time,
            end_time: meta.end_time,
            url: meta.url,
            processed_at: parse_timestamp(&meta.processed_at),
        })
    }

    fn chunks(&self, video_filter: Option<&str>) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, document, metadata, embedding
            FROM documents
            WHERE kind = ?1 AND (?2 IS NULL OR video_id = ?2)
            "#,
        )?;

        let rows = stmt
            .query_map(params![KIND_CHUNK, video_filter], Self::raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::decode_chunk).collect()
    }
}

#[async_trait]
impl VectorStore for CollectionStore {
    fn backend(&self) -> &'static str {
        "vector"
    }

    #[instrument(skip(self, record), fields(id = %record.key()))]
    async fn upsert(&self, record: &SummaryRecord) -> Result<()> {
        let conn = self.conn()?;
        Self::write(&conn, record).map_err(|e| {
            warn!("Rolled back write of {}: {}", record.key(), e);
            e
        })?;
        debug!("Upserted document {}", record.key());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT video_id, document, metadata, embedding FROM documents WHERE id = ?1 AND kind = ?2",
                params![video_id, KIND_VIDEO],
                Self::raw_row,
            )
            .optional()?;

        row.map(Self::decode_video).transpose()
    }

    #[instrument(skip(self))]
    async fn get_chunk(&self, video_id: &str, chunk_id: u32) -> Result<Option<ChunkRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT video_id, document, metadata, embedding FROM documents WHERE id = ?1 AND kind = ?2",
                params![chunk_key(video_id, chunk_id), KIND_CHUNK],
                Self::raw_row,
            )
            .optional()?;

        row.map(Self::decode_chunk).transpose()
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        video_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>> {
        let chunks = self.chunks(video_filter)?;
        let matches = rank_chunks(query_embedding, chunks, limit);
        debug!("Found {} matching chunks", matches.len());
        Ok(matches)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        let rows = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT video_id, document, metadata, embedding FROM documents WHERE kind = ?1",
            )?;
            let rows = stmt
                .query_map(params![KIND_VIDEO], Self::raw_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut videos = rows
            .into_iter()
            .map(Self::decode_video)
            .collect::<Result<Vec<_>>>()?;
        videos.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn list_chunks(&self, video_filter: Option<&str>) -> Result<Vec<ChunkRecord>> {
        let mut chunks = self.chunks(video_filter)?;
        chunks.sort_by(|a, b| {
            a.video_id
                .cmp(&b.video_id)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::fixtures;

    #[tokio::test]
    async fn test_chunk_roundtrip() {
        let store = CollectionStore::in_memory().unwrap();
        let chunk = fixtures::chunk("video1", 2, vec![1.0, 0.0, 0.0]);

        store.upsert(&SummaryRecord::Chunk(chunk.clone())).await.unwrap();

        let loaded = store.get_chunk("video1", 2).await.unwrap().unwrap();
        assert_eq!(loaded.title, chunk.title);
        assert_eq!(loaded.summary, chunk.summary);
        assert_eq!(loaded.content, chunk.content);
        assert_eq!(loaded.start_time, chunk.start_time);
        assert_eq!(loaded.end_time, chunk.end_time);
        assert_eq!(loaded.url, chunk.url);
        assert_eq!(loaded.embedding, chunk.embedding);

        assert!(store.get_chunk("video1", 3).await.unwrap().is_none());
        assert!(store.get_video("video1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_video() {
        let store = CollectionStore::in_memory().unwrap();
        let mut video = fixtures::video("video1", vec![0.5, 0.5]);
        store.upsert(&SummaryRecord::Video(video.clone())).await.unwrap();

        video.summary = "A better summary".to_string();
        store.upsert(&SummaryRecord::Video(video.clone())).await.unwrap();

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].summary, "A better summary");
        assert_eq!(store.get_video("video1").await.unwrap().unwrap().length_seconds, 600);
    }

    #[tokio::test]
    async fn test_search_filters_and_orders() {
        let store = CollectionStore::in_memory().unwrap();
        for record in [
            fixtures::chunk("a", 0, vec![1.0, 0.0]),
            fixtures::chunk("a", 1, vec![0.0, 1.0]),
            fixtures::chunk("b", 0, vec![1.0, 0.1]),
        ] {
            store.upsert(&SummaryRecord::Chunk(record)).await.unwrap();
        }
        store
            .upsert(&SummaryRecord::Video(fixtures::video("a", vec![1.0, 0.0])))
            .await
            .unwrap();

        let all = store.search_chunks(&[1.0, 0.0], None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!((all[0].record.video_id.as_str(), all[0].record.chunk_id), ("a", 0));
        assert_eq!(all[1].record.video_id, "b");

        let only_a = store.search_chunks(&[1.0, 0.0], Some("a"), 10).await.unwrap();
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|m| m.record.video_id == "a"));

        let listed = store.list_chunks(None).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|c| chunk_key(&c.video_id, c.chunk_id)).collect();
        assert_eq!(keys, vec!["a_0", "a_1", "b_0"]);
    }

    #[tokio::test]
    async fn test_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vectors.db");
        {
            let store = CollectionStore::new(&path).unwrap();
            store
                .upsert(&SummaryRecord::Video(fixtures::video("v", vec![1.0])))
                .await
                .unwrap();
        }
        let store = CollectionStore::new(&path).unwrap();
        assert!(store.get_video("v").await.unwrap().is_some());
    }
}
