//! Video metadata and channel listings.
//!
//! Provides a trait-based interface over the video platform so the pipeline can
//! be exercised without network access.

mod youtube;

pub use youtube::YoutubeDataApi;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Metadata for a single video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    /// Video ID.
    pub video_id: String,
    /// Title.
    pub title: String,
    /// Length in seconds.
    pub length_seconds: f64,
    /// Channel name (if available).
    pub channel: Option<String>,
    /// Publication date (if available).
    pub published_at: Option<DateTime<Utc>>,
}

/// A video as listed on a channel page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelVideo {
    pub id: String,
    pub title: String,
}

/// Trait for video platform clients.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Fetch title and duration for a video.
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails>;

    /// List every video of a channel, following pagination to the end.
    async fn list_channel_videos(&self, channel_id: &str) -> Result<Vec<ChannelVideo>>;
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("video id pattern is valid")
    })
}

/// Extract a video ID from a YouTube URL or a bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Parse an ISO-8601 duration as used by the Data API (`PT1H2M3S`) into seconds.
pub fn parse_iso8601_duration(value: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
            .expect("duration pattern is valid")
    });

    let caps = re.captures(value.trim())?;
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    Some(part(1) * 604_800.0 + part(2) * 86_400.0 + part(3) * 3_600.0 + part(4) * 60.0 + part(5))
}

/// Build the timestamped short link for a point in a video.
pub fn timestamp_url(video_id: &str, start_seconds: f64) -> String {
    format!("https://youtu.be/{}?t={}", video_id, start_seconds.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=vbp7EjCck4M"),
            Some("vbp7EjCck4M".to_string())
        );
        assert_eq!(extract_video_id("  vbp7EjCck4M "), Some("vbp7EjCck4M".to_string()));

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723.0));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45.0));
        assert_eq!(parse_iso8601_duration("PT10M"), Some(600.0));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401.0));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0.0));
        assert_eq!(parse_iso8601_duration("1:02:03"), None);
    }

    #[test]
    fn test_timestamp_url() {
        assert_eq!(timestamp_url("abc", 12.9), "https://youtu.be/abc?t=12");
        assert_eq!(timestamp_url("abc", 0.0), "https://youtu.be/abc?t=0");
    }
}
