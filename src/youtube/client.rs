use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};

use crate::{
    config,
    error::MigrationError,
    management::TokenManager,
    pipeline::DestinationCatalog,
    types::{
        Candidate, GoogleErrorResponse, InsertPlaylistItemRequest, InsertPlaylistRequest,
        PlaylistHandle, PlaylistItemSnippet, PlaylistSnippet, PlaylistStatus, Privacy, Provider,
        ResourceId, SearchListResponse, YouTubePlaylist,
    },
    utils,
};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Error reasons Google reports for quota and rate limits. A 403 carrying one
/// of these is not a credentials problem.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

pub struct YouTubeClient {
    http: Client,
    base_url: String,
    tokens: Mutex<TokenManager>,
}

impl YouTubeClient {
    /// Client for the cached YouTube login.
    pub async fn connect() -> Result<Self, MigrationError> {
        let tokens = TokenManager::load(Provider::YouTube)
            .await
            .map_err(|e| MigrationError::DestinationAuthFailure(e.to_string()))?;
        Ok(Self::new(tokens, config::youtube_apiurl()))
    }

    pub fn new(tokens: TokenManager, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(tokens),
        }
    }

    async fn send<T, F>(&self, what: &str, build: F) -> Result<T, MigrationError>
    where
        T: DeserializeOwned,
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let mut attempt: u32 = 0;

        loop {
            let token = self
                .tokens
                .lock()
                .await
                .get_valid_token()
                .await
                .map_err(|e| MigrationError::DestinationAuthFailure(e.to_string()))?;

            let response = match build(&self.http, &self.base_url)
                .bearer_auth(token)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if attempt < MAX_RETRIES && (e.is_timeout() || e.is_connect()) => {
                    attempt += 1;
                    let delay = backoff(attempt);
                    debug!(what, attempt, ?delay, error = %e, "youtube.retry");
                    sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(MigrationError::Destination(format!("{what}: {e}"))),
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .map_err(|e| MigrationError::Destination(format!("{what}: {e}")));
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < MAX_RETRIES {
                attempt += 1;
                let delay = utils::retry_after_secs(response.headers())
                    .filter(|secs| *secs <= MAX_RETRY_AFTER_SECS)
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| backoff(attempt));
                debug!(what, attempt, %status, ?delay, "youtube.retry");
                sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let error = classify_error(status, &body);
            warn!(what, %status, error = %error, "youtube.request_failed");
            return Err(error);
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(0..250);
    BASE_BACKOFF * 2u32.pow(attempt.saturating_sub(1)) + Duration::from_millis(jitter)
}

/// Maps a failed response to the pipeline's error taxonomy.
///
/// 401 always means the credentials were rejected. 403 does too, unless the
/// body names a quota or rate-limit reason.
pub fn classify_error(status: StatusCode, body: &str) -> MigrationError {
    let parsed = serde_json::from_str::<GoogleErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let quota = parsed
        .as_ref()
        .map(|e| {
            e.error
                .errors
                .iter()
                .any(|d| QUOTA_REASONS.contains(&d.reason.as_str()))
        })
        .unwrap_or(false);

    match status {
        StatusCode::UNAUTHORIZED => {
            MigrationError::DestinationAuthFailure(format!("{status}: {message}"))
        }
        StatusCode::FORBIDDEN if !quota => {
            MigrationError::DestinationAuthFailure(format!("{status}: {message}"))
        }
        _ => MigrationError::Destination(format!("{status}: {message}")),
    }
}

#[async_trait]
impl DestinationCatalog for YouTubeClient {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<Candidate>, MigrationError> {
        let max_results = max_results.to_string();
        let response: SearchListResponse = self
            .send("search", |http, base| {
                http.get(format!("{base}/search")).query(&[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", max_results.as_str()),
                    ("q", query),
                ])
            })
            .await?;

        let candidates = response
            .items
            .into_iter()
            .filter_map(|item| {
                let item_id = item.id.video_id?;
                let snippet = item.snippet.unwrap_or_default();
                Some(Candidate {
                    item_id,
                    title: snippet.title,
                    channel_title: snippet.channel_title,
                })
            })
            .collect::<Vec<_>>();
        debug!(query, hits = candidates.len(), "youtube.search");
        Ok(candidates)
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<PlaylistHandle, MigrationError> {
        let body = InsertPlaylistRequest {
            snippet: PlaylistSnippet {
                title: title.to_string(),
                description: description.to_string(),
            },
            status: PlaylistStatus {
                privacy_status: privacy.as_str().to_string(),
            },
        };
        let playlist: YouTubePlaylist = self
            .send("playlists.insert", |http, base| {
                http.post(format!("{base}/playlists"))
                    .query(&[("part", "snippet,status")])
                    .json(&body)
            })
            .await?;

        Ok(PlaylistHandle {
            destination_playlist_id: playlist.id,
        })
    }

    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        item_id: &str,
    ) -> Result<(), MigrationError> {
        let body = InsertPlaylistItemRequest {
            snippet: PlaylistItemSnippet {
                playlist_id: playlist_id.to_string(),
                resource_id: ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: item_id.to_string(),
                },
            },
        };
        let _: Value = self
            .send("playlistItems.insert", |http, base| {
                http.post(format!("{base}/playlistItems"))
                    .query(&[("part", "snippet")])
                    .json(&body)
            })
            .await?;
        Ok(())
    }
}
