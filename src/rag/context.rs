//! Context assembly for question answering.

use crate::vector_store::{format_timestamp, ChunkMatch};
use serde::Serialize;

/// A retrieved chunk cited by an answer.
#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub start: f64,
    pub end: f64,
    pub summary: String,
    /// Cosine distance to the question.
    pub distance: f32,
}

impl From<ChunkMatch> for Reference {
    fn from(m: ChunkMatch) -> Self {
        Self {
            video_id: m.record.video_id,
            title: m.record.title,
            url: m.record.url,
            start: m.record.start_time,
            end: m.record.end_time,
            summary: m.record.summary,
            distance: m.distance,
        }
    }
}

impl Reference {
    /// Start of the cited span as `MM:SS`.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.start)
    }
}

/// Render references as the context block of the answer prompt.
pub fn format_context_for_prompt(references: &[Reference]) -> String {
    references
        .iter()
        .map(|r| {
            format!(
                "Video: {}\nSummary: {}\nVideo Time: start: {} end: {}\nVideo snipped url: {}",
                r.title, r.summary, r.start, r.end, r.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render references for the terminal.
pub fn format_references_for_display(references: &[Reference]) -> String {
    references
        .iter()
        .map(|r| {
            format!(
                "{} @ {} (distance: {:.2})\n  Link: {}",
                r.title,
                r.timestamp(),
                r.distance,
                r.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
