//! YouTube Data API v3 client.

use super::{parse_iso8601_duration, ChannelVideo, VideoCatalog, VideoDetails};
use crate::error::{Result, TubesageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
const ERROR_EXCERPT_CHARS: usize = 300;

/// Key-authenticated YouTube Data API client.
pub struct YoutubeDataApi {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
    page_size: u32,
    event_type: Option<String>,
}

impl YoutubeDataApi {
    /// Create a new client.
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(TubesageError::Config(
                "YOUTUBE_API_KEY is not set. Set it with: export YOUTUBE_API_KEY='...'".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(API_BASE)
            .map_err(|e| TubesageError::Config(format!("Invalid API base URL: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            base_url,
            page_size: 50,
            event_type: None,
        })
    }

    /// Set the page size for channel listings (clamped to 1..=50).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 50);
        self
    }

    /// Restrict channel listings to an `eventType` (e.g. "completed").
    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type.filter(|e| !e.is_empty());
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TubesageError::VideoSource(format!("Invalid endpoint {}: {}", path, e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TubesageError::VideoSource(format!(
                "YouTube API returned {}: {}",
                status,
                error_excerpt(&body)
            )));
        }
        Ok(response.json::<T>().await?)
    }

    async fn search_page(&self, channel_id: &str, page_token: Option<String>) -> Result<SearchPage> {
        let page_size = self.page_size.to_string();
        let mut params = vec![
            ("part", "id,snippet"),
            ("channelId", channel_id),
            ("type", "video"),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(event_type) = &self.event_type {
            params.push(("eventType", event_type.as_str()));
        }
        if let Some(token) = &page_token {
            params.push(("pageToken", token.as_str()));
        }

        let url = self.endpoint("search", &params)?;
        self.get_json(url).await
    }
}

#[async_trait]
impl VideoCatalog for YoutubeDataApi {
    #[instrument(skip(self))]
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails> {
        let url = self.endpoint("videos", &[("part", "contentDetails,snippet"), ("id", video_id)])?;
        let response: VideoListResponse = self.get_json(url).await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| TubesageError::VideoNotFound(video_id.to_string()))?;

        let length_seconds = parse_iso8601_duration(&item.content_details.duration).unwrap_or_else(|| {
            warn!("Unparseable duration '{}' for {}", item.content_details.duration, video_id);
            0.0
        });

        Ok(VideoDetails {
            video_id: video_id.to_string(),
            title: item.snippet.title,
            length_seconds,
            channel: item.snippet.channel_title,
            published_at: item.snippet.published_at,
        })
    }

    #[instrument(skip(self))]
    async fn list_channel_videos(&self, channel_id: &str) -> Result<Vec<ChannelVideo>> {
        let videos = drain_pages(|token| self.search_page(channel_id, token)).await?;
        info!("Listed {} videos for channel {}", videos.len(), channel_id);
        Ok(videos)
    }
}

/// Follow `nextPageToken` until the listing is exhausted.
async fn drain_pages<F, Fut>(mut fetch: F) -> Result<Vec<ChannelVideo>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<SearchPage>>,
{
    let mut videos = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = fetch(token.clone()).await?;
        debug!("Received page with {} items", page.items.len());

        videos.extend(page.items.into_iter().filter_map(|item| {
            item.id.video_id.map(|id| ChannelVideo {
                id,
                title: item.snippet.title,
            })
        }));

        match page.next_page_token {
            Some(next) if Some(&next) != token.as_ref() => token = Some(next),
            _ => break,
        }
    }

    Ok(videos)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

/// Leading part of an error body, cut on a char boundary.
fn error_excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_EXCERPT_CHARS) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    content_details: ContentDetails,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn page(json: &str) -> SearchPage {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_drain_pages_follows_tokens() {
        let mut pages: HashMap<Option<String>, SearchPage> = HashMap::new();
        pages.insert(
            None,
            page(r#"{"items":[{"id":{"videoId":"aaaaaaaaaaa"},"snippet":{"title":"One"}}],"nextPageToken":"p2"}"#),
        );
        pages.insert(
            Some("p2".to_string()),
            page(r#"{"items":[{"id":{"kind":"youtube#playlist"},"snippet":{"title":"Skip"}},{"id":{"videoId":"bbbbbbbbbbb"},"snippet":{"title":"Two"}}],"nextPageToken":"p3"}"#),
        );
        pages.insert(
            Some("p3".to_string()),
            page(r#"{"items":[{"id":{"videoId":"ccccccccccc"},"snippet":{"title":"Three"}}]}"#),
        );

        let mut requested = Vec::new();
        let videos = drain_pages(|token| {
            requested.push(token.clone());
            let result = pages
                .remove(&token)
                .ok_or_else(|| TubesageError::VideoSource("unexpected page".to_string()));
            async move { result }
        })
        .await
        .unwrap();

        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]);
        assert_eq!(requested.len(), 3);
    }

    #[tokio::test]
    async fn test_drain_pages_stops_on_repeated_token() {
        let mut calls = 0;
        let videos = drain_pages(|_| {
            calls += 1;
            let p = page(r#"{"items":[],"nextPageToken":"same"}"#);
            async move { Ok(p) }
        })
        .await
        .unwrap();

        assert!(videos.is_empty());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_video_item_deserialize() {
        let json = r#"{"items":[{"id":"vbp7EjCck4M","contentDetails":{"duration":"PT12M5S"},
            "snippet":{"title":"A talk","channelTitle":"Chan","publishedAt":"2024-03-01T10:00:00Z"}}]}"#;
        let response: VideoListResponse = serde_json::from_str(json).unwrap();
        let item = &response.items[0];
        assert_eq!(item.snippet.title, "A talk");
        assert_eq!(parse_iso8601_duration(&item.content_details.duration), Some(725.0));
    }

    #[test]
    fn test_error_excerpt_cuts_on_char_boundary() {
        let body = format!("{}é…", "x".repeat(299));
        let excerpt = error_excerpt(&body);
        assert_eq!(excerpt.chars().count(), 300);
        assert!(excerpt.ends_with('é'));

        assert_eq!(error_excerpt("Quota überschritten"), "Quota überschritten");
    }

    #[tokio::test]
    async fn test_error_status_with_non_ascii_body_is_video_source_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let body = format!("{}é…", "x".repeat(299));
            let response = format!(
                "HTTP/1.1 403 Forbidden\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let mut api = YoutubeDataApi::new("k123").unwrap();
        api.http = reqwest::Client::builder().no_proxy().build().unwrap();
        api.base_url = Url::parse(&format!("http://{}/youtube/v3/", addr)).unwrap();

        match api.video_details("aaaaaaaaaaa").await {
            Err(TubesageError::VideoSource(msg)) => {
                assert!(msg.contains("403"));
                assert!(msg.ends_with('é'));
            }
            other => panic!("unexpected result {:?}", other.map(|d| d.video_id)),
        }
    }

    #[test]
    fn test_missing_key_is_config_error() {
        assert!(matches!(YoutubeDataApi::new(" "), Err(TubesageError::Config(_))));
    }

    #[test]
    fn test_endpoint_carries_key() {
        let api = YoutubeDataApi::new("k123").unwrap();
        let url = api.endpoint("videos", &[("id", "abc")]).unwrap();
        assert_eq!(url.path(), "/youtube/v3/videos");
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("key").map(String::as_str), Some("k123"));
        assert_eq!(query.get("id").map(String::as_str), Some("abc"));
    }
}
