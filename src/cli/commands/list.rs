//! List command implementation.

use crate::cli::Output;
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the list command.
pub async fn run_list(chunks: bool, video: Option<String>, store: Arc<dyn VectorStore>) -> Result<()> {
    if chunks {
        return list_chunks(video.as_deref(), store).await;
    }

    let mut videos = store.list_videos().await?;
    if let Some(video_id) = &video {
        videos.retain(|v| &v.video_id == video_id);
    }

    if videos.is_empty() {
        Output::info("No videos stored yet. Use 'tubesage process <video>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Stored Videos ({}, {} backend)", videos.len(), store.backend()));
    println!();
    for video in &videos {
        Output::video_info(video);
    }

    Ok(())
}

async fn list_chunks(video: Option<&str>, store: Arc<dyn VectorStore>) -> Result<()> {
    let chunks = store.list_chunks(video).await?;

    if chunks.is_empty() {
        Output::info("No chunks stored yet.");
        return Ok(());
    }

    Output::header(&format!("Stored Chunks ({})", chunks.len()));
    for chunk in &chunks {
        Output::chunk_info(chunk);
    }

    println!();
    let videos = chunks
        .iter()
        .map(|c| c.video_id.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    Output::kv("Videos", &videos.to_string());
    Output::kv("Chunks", &chunks.len().to_string());

    Ok(())
}
