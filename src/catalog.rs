use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::plan::duration::parse_iso8601_duration;
use crate::plan::schedule::Item;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v=([^&]+)").expect("video pattern is valid"));
static SHORT_VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([^?&]+)").expect("short video pattern is valid"));
static PLAYLIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"list=([^&]+)").expect("playlist pattern is valid"));

pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(url)
        .or_else(|| SHORT_VIDEO_ID_RE.captures(url))
        .map(|caps| caps[1].to_string())
}

pub fn extract_playlist_id(url: &str) -> Option<String> {
    PLAYLIST_ID_RE.captures(url).map(|caps| caps[1].to_string())
}

/// What a pasted link points at. A link carrying both a playlist and a
/// video marker counts as the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Video(String),
    Playlist(String),
}

pub fn parse_link(url: &str) -> Result<Link> {
    if let Some(id) = extract_playlist_id(url) {
        Ok(Link::Playlist(id))
    } else if let Some(id) = extract_video_id(url) {
        Ok(Link::Video(id))
    } else {
        Err(Error::InvalidInput(
            "could not parse the video or playlist URL".to_string(),
        ))
    }
}

/// Client for the hosted video catalog (YouTube Data API v3).
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResource {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemContent,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContent {
    #[serde(rename = "videoId")]
    video_id: String,
}

impl CatalogClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    pub async fn fetch_video(&self, video_id: &str) -> Result<Item> {
        let mut items = self.list_videos(&[video_id.to_string()]).await?;
        if items.is_empty() {
            return Err(Error::NotFound(format!(
                "no video details found for {video_id}"
            )));
        }
        Ok(items.remove(0))
    }

    /// Every video of a playlist, in playlist order. Pages of 50 are walked
    /// strictly one after the other; each page's durations are looked up
    /// before the next page is requested.
    pub async fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<Item>> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{API_BASE}/playlistItems"))
                .query(&[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", "50"),
                    ("key", self.api_key.as_str()),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: PlaylistItemsResponse = send_json(request).await?;
            let ids: Vec<String> = page
                .items
                .iter()
                .map(|item| item.content_details.video_id.clone())
                .collect();
            if !ids.is_empty() {
                videos.extend(self.list_videos(&ids).await?);
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        info!("fetched {} videos from playlist {playlist_id}", videos.len());
        Ok(videos)
    }

    async fn list_videos(&self, video_ids: &[String]) -> Result<Vec<Item>> {
        let ids = video_ids.join(",");
        let response: VideoListResponse = send_json(self.http.get(format!("{API_BASE}/videos")).query(&[
            ("part", "snippet,contentDetails"),
            ("id", ids.as_str()),
            ("key", self.api_key.as_str()),
        ]))
        .await?;
        Ok(response
            .items
            .into_iter()
            .map(|video| Item {
                title: video.snippet.title,
                length: parse_iso8601_duration(&video.content_details.duration),
                url: format!("https://www.youtube.com/watch?v={}", video.id),
            })
            .collect())
    }
}

async fn send_json<T: serde::de::DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Unavailable(format!("catalog request failed: {e}")))?
        .error_for_status()
        .map_err(|e| Error::Unavailable(format!("catalog request failed: {e}")))?;
    response
        .json()
        .await
        .map_err(|e| Error::Unavailable(format!("catalog response malformed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_standard_video_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn extracts_short_video_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn extracts_playlist_url() {
        assert_eq!(
            extract_playlist_id("https://www.youtube.com/playlist?list=PL123abc"),
            Some("PL123abc".to_string())
        );
    }

    #[test]
    fn playlist_marker_wins_over_video_marker() {
        let link = parse_link("https://www.youtube.com/watch?v=abc&list=PLxyz").unwrap();
        assert_eq!(link, Link::Playlist("PLxyz".to_string()));
    }

    #[test]
    fn unrecognized_link_is_invalid_input() {
        assert!(matches!(
            parse_link("https://example.com/nothing-here"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn playlist_page_deserializes() {
        let page: PlaylistItemsResponse = serde_json::from_str(
            r#"{
                "items": [
                    {"contentDetails": {"videoId": "vid1"}},
                    {"contentDetails": {"videoId": "vid2"}}
                ],
                "nextPageToken": "CAUQAA"
            }"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn video_list_deserializes_to_items() {
        let response: VideoListResponse = serde_json::from_str(
            r#"{
                "items": [{
                    "id": "vid1",
                    "snippet": {"title": "Intro to Widgets"},
                    "contentDetails": {"duration": "PT1H30M"}
                }]
            }"#,
        )
        .unwrap();
        let video = &response.items[0];
        assert_eq!(video.snippet.title, "Intro to Widgets");
        assert_eq!(parse_iso8601_duration(&video.content_details.duration), 5400);
    }
}
