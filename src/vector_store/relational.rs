//! Relational backend: `videos` and `video_chunks` tables in SQLite.

use super::{
    bytes_to_embedding, embedding_to_bytes, parse_timestamp, rank_chunks, ChunkMatch, ChunkRecord,
    SummaryRecord, VectorStore, VideoRecord,
};
use crate::error::{Result, TubesageError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        video_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        length_seconds INTEGER NOT NULL,
        summary TEXT NOT NULL,
        embedding BLOB NOT NULL,
        processed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS video_chunks (
        video_id TEXT NOT NULL,
        chunk_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        url TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        PRIMARY KEY (video_id, chunk_id)
    );
"#;

const VIDEO_COLUMNS: &str = "video_id, title, length_seconds, summary, embedding, processed_at";
const CHUNK_COLUMNS: &str =
    "video_id, chunk_id, title, summary, content, embedding, start_time, end_time, url, processed_at";

/// Relational store of video and chunk rows.
pub struct RelationalStore {
    conn: Mutex<Connection>,
}

impl RelationalStore {
    /// Open or create the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened relational database at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
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
        let tx = conn.unchecked_transaction()?;
        match record {
            SummaryRecord::Video(v) => {
                tx.execute(
                    r#"
                    INSERT INTO videos (video_id, title, length_seconds, summary, embedding, processed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(video_id) DO UPDATE SET
                        title = excluded.title,
                        length_seconds = excluded.length_seconds,
                        summary = excluded.summary,
                        embedding = excluded.embedding,
                        processed_at = excluded.processed_at
                    "#,
                    params![
                        v.video_id,
                        v.title,
                        v.length_seconds,
                        v.summary,
                        embedding_to_bytes(&v.embedding),
                        v.processed_at.to_rfc3339(),
                    ],
                )?;
            }
            SummaryRecord::Chunk(c) => {
                tx.execute(
                    r#"
                    INSERT INTO video_chunks
                    (video_id, chunk_id, title, summary, content, embedding, start_time, end_time, url, processed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(video_id, chunk_id) DO UPDATE SET
                        title = excluded.title,
                        summary = excluded.summary,
                        content = excluded.content,
                        embedding = excluded.embedding,
                        start_time = excluded.start_time,
                        end_time = excluded.end_time,
                        url = excluded.url,
                        processed_at = excluded.processed_at
                    "#,
                    params![
                        c.video_id,
                        c.chunk_id,
                        c.title,
                        c.summary,
                        c.content,
                        embedding_to_bytes(&c.embedding),
                        c.start_time,
                        c.end_time,
                        c.url,
                        c.processed_at.to_rfc3339(),
                    ],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn video_from_row(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
        let embedding: Vec<u8> = row.get(4)?;
        let processed_at: String = row.get(5)?;
        Ok(VideoRecord {
            video_id: row.get(0)?,
            title: row.get(1)?,
            length_seconds: row.get(2)?,
            summary: row.get(3)?,
            embedding: bytes_to_embedding(&embedding),
            processed_at: parse_timestamp(&processed_at),
        })
    }

    fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
        let embedding: Vec<u8> = row.get(5)?;
        let processed_at: String = row.get(9)?;
        Ok(ChunkRecord {
            video_id: row.get(0)?,
            chunk_id: row.get(1)?,
            title: row.get(2)?,
            summary: row.get(3)?,
            content: row.get(4)?,
            embedding: bytes_to_embedding(&embedding),
            start_time: row.get(6)?,
            end_time: row.get(7)?,
            url: row.get(8)?,
            processed_at: parse_timestamp(&processed_at),
        })
    }

    fn chunks(&self, video_filter: Option<&str>) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM video_chunks WHERE ?1 IS NULL OR video_id = ?1 ORDER BY video_id, chunk_id",
            CHUNK_COLUMNS
        ))?;
        let chunks = stmt
            .query_map(params![video_filter], Self::chunk_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }
}

#[async_trait]
impl VectorStore for RelationalStore {
    fn backend(&self) -> &'static str {
        "relational"
    }

    #[instrument(skip(self, record), fields(id = %record.key()))]
    async fn upsert(&self, record: &SummaryRecord) -> Result<()> {
        let conn = self.conn()?;
        Self::write(&conn, record).map_err(|e| {
            warn!("Rolled back write of {}: {}", record.key(), e);
            e
        })?;
        debug!("Upserted row {}", record.key());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let conn = self.conn()?;
        let video = conn
            .query_row(
                &format!("SELECT {} FROM videos WHERE video_id = ?1", VIDEO_COLUMNS),
                params![video_id],
                Self::video_from_row,
            )
            .optional()?;
        Ok(video)
    }

    #[instrument(skip(self))]
    async fn get_chunk(&self, video_id: &str, chunk_id: u32) -> Result<Option<ChunkRecord>> {
        let conn = self.conn()?;
        let chunk = conn
            .query_row(
                &format!(
                    "SELECT {} FROM video_chunks WHERE video_id = ?1 AND chunk_id = ?2",
                    CHUNK_COLUMNS
                ),
                params![video_id, chunk_id],
                Self::chunk_from_row,
            )
            .optional()?;
        Ok(chunk)
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
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM videos ORDER BY processed_at DESC",
            VIDEO_COLUMNS
        ))?;
        let videos = stmt
            .query_map([], Self::video_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn list_chunks(&self, video_filter: Option<&str>) -> Result<Vec<ChunkRecord>> {
        self.chunks(video_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::fixtures;

    #[tokio::test]
    async fn test_chunk_roundtrip() {
        let store = RelationalStore::in_memory().unwrap();
        let chunk = fixtures::chunk("video1", 2, vec![1.0, 0.0, 0.0]);

        store.upsert(&SummaryRecord::Chunk(chunk.clone())).await.unwrap();

        let loaded = store.get_chunk("video1", 2).await.unwrap().unwrap();
        assert_eq!(loaded.title, chunk.title);
        assert_eq!(loaded.summary, chunk.summary);
        assert_eq!(loaded.start_time, chunk.start_time);
        assert_eq!(loaded.end_time, chunk.end_time);
        assert_eq!(loaded.url, chunk.url);
        assert_eq!(loaded.embedding, chunk.embedding);
    }

    #[tokio::test]
    async fn test_video_upsert_replaces() {
        let store = RelationalStore::in_memory().unwrap();
        let mut video = fixtures::video("video1", vec![1.0, 2.0]);
        store.upsert(&SummaryRecord::Video(video.clone())).await.unwrap();

        video.title = "Renamed".to_string();
        video.length_seconds = 61;
        store.upsert(&SummaryRecord::Video(video)).await.unwrap();

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Renamed");
        assert_eq!(videos[0].length_seconds, 61);
        assert_eq!(videos[0].embedding, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_search_with_video_filter() {
        let store = RelationalStore::in_memory().unwrap();
        for record in [
            fixtures::chunk("a", 0, vec![0.0, 1.0]),
            fixtures::chunk("a", 1, vec![1.0, 0.0]),
            fixtures::chunk("b", 0, vec![1.0, 0.0]),
        ] {
            store.upsert(&SummaryRecord::Chunk(record)).await.unwrap();
        }

        let matches = store.search_chunks(&[1.0, 0.0], Some("a"), 1).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.chunk_id, 1);
        assert!(matches[0].distance.abs() < 0.001);

        assert_eq!(store.list_chunks(Some("b")).await.unwrap().len(), 1);
        assert_eq!(store.list_chunks(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_opens_bare_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.db");
        let store = RelationalStore::new(&path).unwrap();
        assert_eq!(store.backend(), "relational");
        assert!(path.exists());
    }
}
