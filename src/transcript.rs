use moka::future::Cache;
use yt_transcript_rs::api::YouTubeTranscriptApi;

use crate::error::{Error, Result};

/// Ordered fallback chain of caption languages tried before giving up.
const LANGUAGES: [&str; 2] = ["en", "es"];

const CACHE_CAPACITY: u64 = 256;

#[derive(Clone)]
pub struct TranscriptService {
    api: YouTubeTranscriptApi,
    cache: Cache<String, String>,
}

impl TranscriptService {
    pub fn new() -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::Unavailable(format!("transcript api init failed: {e}")))?;
        Ok(Self {
            api,
            cache: Cache::new(CACHE_CAPACITY),
        })
    }

    /// Plain-text transcript of a video, joined from its caption snippets.
    /// Transcripts are cached per video so regenerating a day's material
    /// does not refetch.
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<String> {
        if let Some(text) = self.cache.get(video_id).await {
            return Ok(text);
        }
        let transcript = self
            .api
            .fetch_transcript(video_id, &LANGUAGES, false)
            .await
            .map_err(|e| Error::Unavailable(format!("failed to fetch transcript: {e}")))?;
        let text = transcript
            .snippets
            .iter()
            .map(|snippet| snippet.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        self.cache.insert(video_id.to_string(), text.clone()).await;
        Ok(text)
    }
}
