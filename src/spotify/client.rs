use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};

use crate::{
    config,
    error::MigrationError,
    management::TokenManager,
    pipeline::SourceCatalog,
    types::{
        Page, PlaylistSummary, Provider, SpotifyPaging, SpotifyPlaylist, SpotifyTrackItem, Track,
    },
    utils,
};

const MAX_RETRY_AFTER_SECS: u64 = 120;
const PLAYLISTS_PAGE_SIZE: u32 = 50;

/// Read-only client for the signed-in user's Spotify library.
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    /// Client for the cached Spotify login.
    pub async fn connect() -> Result<Self, MigrationError> {
        let tokens = TokenManager::load(Provider::Spotify).await?;
        Ok(Self::new(tokens, config::spotify_apiurl()))
    }

    pub fn new(tokens: TokenManager, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(tokens),
        }
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, MigrationError> {
        Url::parse_with_params(&format!("{}{path}", self.base_url), params)
            .map_err(|e| MigrationError::SourceUnavailable(format!("invalid url for {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, MigrationError> {
        let mut waited = false;

        loop {
            let token = self.tokens.lock().await.get_valid_token().await?;
            let response = self
                .http
                .get(url.clone())
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| MigrationError::SourceUnavailable(format!("GET {url}: {e}")))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && !waited {
                let retry_after = utils::retry_after_secs(response.headers()).unwrap_or(1);
                if retry_after <= MAX_RETRY_AFTER_SECS {
                    debug!(retry_after, "spotify.rate_limited");
                    sleep(Duration::from_secs(retry_after)).await;
                    waited = true;
                    continue;
                }
                warn!(retry_after, "spotify.retry_after_too_high");
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(MigrationError::SourceUnavailable(format!(
                    "GET {path} returned {status}: {body}",
                    path = url.path()
                )));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| MigrationError::SourceUnavailable(format!("decoding {url}: {e}")));
        }
    }
}

/// Converts raw track entries into a page, counting the unusable ones as
/// dropped.
pub fn tracks_page(items: Vec<SpotifyTrackItem>) -> Page<Track> {
    let mut page = Page::new(Vec::with_capacity(items.len()));
    for item in items {
        let usable = item.track.and_then(|track| {
            let artist = track.artists.first()?.name.clone();
            if track.name.trim().is_empty() || artist.trim().is_empty() {
                return None;
            }
            Some(Track::new(&track.name, &artist, track.id.unwrap_or_default()))
        });
        match usable {
            Some(track) => page.items.push(track),
            None => page.dropped += 1,
        }
    }
    page
}

#[async_trait]
impl SourceCatalog for SpotifyClient {
    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, MigrationError> {
        let mut playlists = Vec::new();
        let mut next = Some(self.url(
            "/me/playlists",
            &[("limit", PLAYLISTS_PAGE_SIZE.to_string())],
        )?);

        while let Some(url) = next.take() {
            let page: SpotifyPaging<Option<SpotifyPlaylist>> = self.get_json(url).await?;
            playlists.extend(page.items.into_iter().flatten().map(|p| PlaylistSummary {
                id: p.id,
                name: p.name,
                description: p.description.unwrap_or_default(),
                track_count: p.tracks.map(|t| t.total).unwrap_or(0),
            }));
            next = match page.next {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    MigrationError::SourceUnavailable(format!("invalid next link {link}: {e}"))
                })?),
                None => None,
            };
        }

        debug!(count = playlists.len(), "spotify.playlists");
        Ok(playlists)
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, MigrationError> {
        let url = self.url(
            &format!("/playlists/{playlist_id}/tracks"),
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("fields", "items(track(id,name,artists(name))),next,total".to_string()),
            ],
        )?;
        let page: SpotifyPaging<SpotifyTrackItem> = self.get_json(url).await?;
        Ok(tracks_page(page.items))
    }

    async fn list_saved_tracks(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, MigrationError> {
        let url = self.url(
            "/me/tracks",
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        )?;
        let page: SpotifyPaging<SpotifyTrackItem> = self.get_json(url).await?;
        Ok(tracks_page(page.items))
    }
}
