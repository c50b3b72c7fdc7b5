//! Transcript merging and chunking.
//!
//! Captions are merged into one text blob while remembering which byte range
//! each caption occupies. The blob is then cut into overlapping chunks by a
//! boundary-aware splitter, and every chunk gets its timing back from that map.

use crate::config::{ChunkingSettings, DurationRule};
use crate::error::{Result, TubesageError};
use crate::transcript::TranscriptSegment;
use serde::{Deserialize, Serialize};
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Where a caption ended up in the merged text.
///
/// `start_idx..end_idx` is half-open and includes the separating space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpan {
    pub start: f64,
    pub duration: f64,
    pub start_idx: usize,
    pub end_idx: usize,
}

impl SegmentSpan {
    fn contains(&self, offset: usize) -> bool {
        self.start_idx <= offset && offset < self.end_idx
    }
}

/// A chunk of merged text with its inferred timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedChunk {
    /// Chunk text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Accumulated duration in seconds.
    pub duration: f64,
    /// Byte offset of the chunk in the merged text.
    pub offset: usize,
}

impl TimedChunk {
    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub overlap: usize,
    /// How chunk durations are accumulated.
    pub duration_rule: DurationRule,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
            duration_rule: DurationRule::Overlap,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.overlap,
            duration_rule: settings.duration_rule,
        }
    }
}

/// Concatenate captions, each followed by one space, and record their spans.
///
/// The returned text is right-trimmed; the last span still ends one past it.
pub fn merge_segments(segments: &[TranscriptSegment]) -> (String, Vec<SegmentSpan>) {
    let mut merged = String::new();
    let mut spans = Vec::with_capacity(segments.len());

    for segment in segments {
        let start_idx = merged.len();
        merged.push_str(&segment.text);
        merged.push(' ');
        spans.push(SegmentSpan {
            start: segment.start,
            duration: segment.duration,
            start_idx,
            end_idx: merged.len(),
        });
    }

    let trimmed_len = merged.trim_end().len();
    merged.truncate(trimmed_len);

    (merged, spans)
}

/// Split merged text into overlapping chunks and map each back to a timestamp.
pub fn split_with_timestamps(
    text: &str,
    spans: &[SegmentSpan],
    config: &ChunkingConfig,
) -> Result<Vec<TimedChunk>> {
    let first = spans.first().ok_or_else(|| {
        TubesageError::InvalidInput("cannot split a transcript without segments".to_string())
    })?;

    let splitter = build_splitter(config)?;

    let chunks: Vec<TimedChunk> = splitter
        .chunk_indices(text)
        .map(|(offset, chunk)| {
            let start = spans
                .iter()
                .find(|s| s.contains(offset))
                .map_or(first.start, |s| s.start);

            let duration = chunk_duration(spans, offset, offset + chunk.len(), config.duration_rule);

            TimedChunk {
                text: chunk.to_string(),
                start,
                duration,
                offset,
            }
        })
        .collect();

    debug!("Split {} bytes into {} chunks", text.len(), chunks.len());
    Ok(chunks)
}

fn build_splitter(config: &ChunkingConfig) -> Result<TextSplitter<text_splitter::Characters>> {
    if config.chunk_size == 0 {
        return Err(TubesageError::Config("chunk_size must be greater than zero".to_string()));
    }
    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.overlap)
        .map_err(|e| TubesageError::Config(format!("Invalid chunk overlap: {}", e)))?;
    Ok(TextSplitter::new(chunk_config))
}

fn chunk_duration(spans: &[SegmentSpan], start: usize, end: usize, rule: DurationRule) -> f64 {
    match rule {
        DurationRule::Overlap => spans
            .iter()
            .filter(|s| s.start_idx < end && start < s.end_idx)
            .map(|s| s.duration)
            .sum(),
        DurationRule::ClosingBoundary => spans
            .iter()
            .filter(|s| s.start_idx <= end && end <= s.end_idx)
            .map(|s| s.duration)
            .sum(),
    }
}
