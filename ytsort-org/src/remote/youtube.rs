//! YouTube Data API client
//!
//! Collections are playlists, entries are playlist items, items are videos.
//! Every request goes through a shared [`RateLimiter`] so that concurrent
//! detail workers still respect the configured request spacing.

use super::{CollectionAccessor, ItemDetails, RemoteError};
use crate::models::{CollectionEntry, EntryId, Item, ItemId};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use ytsort_common::config::ApiConfig;
use ytsort_common::time::{parse_iso8601_duration, parse_timestamp};

const USER_AGENT: &str = concat!("ytsort/", env!("CARGO_PKG_VERSION"));

/// Largest page/batch the API accepts
const API_MAX_RESULTS: usize = 50;

/// Spaces consecutive requests at least `min_interval` apart
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemPage {
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    id: String,
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    position: usize,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistResource>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct InsertedResource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VideoPage {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: VideoSnippet,
    content_details: VideoContentDetails,
    status: Option<VideoStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    channel_id: String,
    #[serde(default)]
    channel_title: String,
    published_at: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    privacy_status: String,
}

impl VideoResource {
    fn into_item(self) -> Result<Item, RemoteError> {
        let duration_secs = parse_iso8601_duration(&self.content_details.duration)
            .map_err(|e| RemoteError::Parse(format!("video {}: {}", self.id, e)))?;
        let published_at = parse_timestamp(&self.snippet.published_at)
            .map_err(|e| RemoteError::Parse(format!("video {}: {}", self.id, e)))?;
        let private = self
            .status
            .map(|s| s.privacy_status == "private")
            .unwrap_or(false);

        Ok(Item {
            id: self.id,
            title: self.snippet.title,
            source_id: self.snippet.channel_id,
            source_title: self.snippet.channel_title,
            duration_secs,
            published_at,
            private,
        })
    }
}

/// Playlist and video access over HTTPS
pub struct YouTubeClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
    page_size: usize,
    rate_limiter: Arc<RateLimiter>,
}

impl YouTubeClient {
    pub fn new(api: &ApiConfig, access_token: String) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            access_token,
            page_size: (api.page_size as usize).clamp(1, API_MAX_RESULTS),
            rate_limiter: Arc::new(RateLimiter::new(api.request_interval_ms)),
        })
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.base_url, resource))
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        self.rate_limiter.wait().await;

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 => RemoteError::Auth(body),
            403 if body.contains("quotaExceeded") || body.contains("rateLimitExceeded") => {
                RemoteError::RateLimited
            }
            403 => RemoteError::Auth(body),
            404 => RemoteError::NotFound(body),
            429 => RemoteError::RateLimited,
            code => RemoteError::Api(code, body),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CollectionAccessor for YouTubeClient {
    async fn list(&self, collection_id: &str) -> Result<Vec<CollectionEntry>, RemoteError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        let max_results = self.page_size.to_string();

        loop {
            let mut query = vec![
                ("part", "snippet"),
                ("playlistId", collection_id),
                ("maxResults", max_results.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: PlaylistItemPage = self
                .send_json(self.request(Method::GET, "playlistItems").query(&query))
                .await?;

            entries.extend(page.items.into_iter().map(|resource| CollectionEntry {
                entry_id: resource.id,
                collection_id: collection_id.to_string(),
                position: resource.snippet.position,
                item_id: resource.snippet.resource_id.video_id,
                title: resource.snippet.title,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        entries.sort_by_key(|e| e.position);
        tracing::debug!(
            collection_id = %collection_id,
            entries = entries.len(),
            "Listed playlist"
        );
        Ok(entries)
    }

    async fn title(&self, collection_id: &str) -> Result<String, RemoteError> {
        let page: PlaylistPage = self
            .send_json(
                self.request(Method::GET, "playlists")
                    .query(&[("part", "snippet"), ("id", collection_id)]),
            )
            .await?;

        page.items
            .into_iter()
            .next()
            .map(|p| p.snippet.title)
            .ok_or_else(|| RemoteError::NotFound(collection_id.to_string()))
    }

    async fn insert(
        &self,
        collection_id: &str,
        item_id: &str,
        position: usize,
    ) -> Result<EntryId, RemoteError> {
        let body = json!({
            "snippet": {
                "playlistId": collection_id,
                "position": position,
                "resourceId": { "kind": "youtube#video", "videoId": item_id },
            }
        });

        let inserted: InsertedResource = self
            .send_json(
                self.request(Method::POST, "playlistItems")
                    .query(&[("part", "snippet")])
                    .json(&body),
            )
            .await?;
        Ok(inserted.id)
    }

    async fn update_position(
        &self,
        entry_id: &str,
        collection_id: &str,
        item_id: &str,
        position: usize,
    ) -> Result<EntryId, RemoteError> {
        let body = json!({
            "id": entry_id,
            "snippet": {
                "playlistId": collection_id,
                "position": position,
                "resourceId": { "kind": "youtube#video", "videoId": item_id },
            }
        });

        let updated: InsertedResource = self
            .send_json(
                self.request(Method::PUT, "playlistItems")
                    .query(&[("part", "snippet")])
                    .json(&body),
            )
            .await?;
        Ok(updated.id)
    }

    async fn delete(&self, entry_id: &str) -> Result<(), RemoteError> {
        self.send(
            self.request(Method::DELETE, "playlistItems")
                .query(&[("id", entry_id)]),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ItemDetails for YouTubeClient {
    fn max_batch(&self) -> usize {
        API_MAX_RESULTS
    }

    async fn fetch_items(&self, item_ids: &[ItemId]) -> Result<Vec<Item>, RemoteError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = item_ids.join(",");
        let page: VideoPage = self
            .send_json(self.request(Method::GET, "videos").query(&[
                ("part", "snippet,contentDetails,status"),
                ("id", ids.as_str()),
                ("maxResults", "50"),
            ]))
            .await?;

        page.items.into_iter().map(VideoResource::into_item).collect()
    }
}
