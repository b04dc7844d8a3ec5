//! YouTube Data API v3 search for course-like videos.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{CourseCandidate, CourseSource};

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Videos have no retrieval score; they all rank as a strong but not exact match.
const VIDEO_SIMILARITY: f32 = 0.8;

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    description: String,
}

#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Result<Self, YouTubeError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: YOUTUBE_API_BASE.to_string(),
            api_key,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Searches for `"<query> course tutorial"` videos, most relevant first.
    pub async fn search_courses(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<CourseCandidate>, YouTubeError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let q = format!("{query} course tutorial");
        let max_results = max_results.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", q.as_str()),
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("order", "relevance"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: SearchResponse = response.json().await?;
        let courses: Vec<CourseCandidate> = body
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(CourseCandidate {
                    title: decode_entities(&item.snippet.title),
                    url: format!("https://www.youtube.com/watch?v={video_id}"),
                    institution: decode_entities(&item.snippet.channel_title),
                    rating: String::new(),
                    description: decode_entities(&item.snippet.description),
                    source: CourseSource::YouTube,
                    similarity: VIDEO_SIMILARITY,
                })
            })
            .collect();

        debug!("YouTube returned {} video(s) for '{}'", courses.len(), query);
        Ok(courses)
    }
}

/// The API returns HTML-escaped snippet text.
fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

pub fn format_youtube_courses(videos: &[CourseCandidate]) -> String {
    if videos.is_empty() {
        return "No YouTube videos found.".to_string();
    }

    let mut out = String::from("**YouTube Courses:**\n\n");
    for (i, video) in videos.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}]({})\n   {}\n\n",
            i + 1,
            video.title,
            video.url,
            video.institution
        ));
    }
    out.trim().to_string()
}
