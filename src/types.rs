use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// A track read from the source catalog.
///
/// Title and artist are trimmed and have line breaks folded to spaces so that
/// the derived [`TrackKey`] always fits on a single ledger line. Case is kept
/// as given by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub primary_artist: String,
    pub source_id: String,
}

impl Track {
    pub fn new(
        title: impl AsRef<str>,
        primary_artist: impl AsRef<str>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            title: normalize(title.as_ref()),
            primary_artist: normalize(primary_artist.as_ref()),
            source_id: source_id.into(),
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey(format!("{} - {}", self.title, self.primary_artist))
    }
}

fn normalize(value: &str) -> String {
    value.replace(['\n', '\r'], " ").trim().to_string()
}

/// Ledger unit of membership: `"<title> - <primary artist>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey(String);

impl TrackKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TrackKey {
    fn from(value: String) -> Self {
        TrackKey(value)
    }
}

impl From<&Track> for TrackKey {
    fn from(track: &Track) -> Self {
        track.key()
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub track: Track,
    pub destination_item_id: Option<String>,
    pub matched_via_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHandle {
    pub destination_playlist_id: String,
}

impl PlaylistHandle {
    pub const DRY_RUN_ID: &'static str = "dry-run-id";

    pub fn dry_run() -> Self {
        Self {
            destination_playlist_id: Self::DRY_RUN_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub track_count: u32,
}

/// Which source collection to migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionRef {
    Playlist(PlaylistSummary),
    LikedSongs,
}

impl CollectionRef {
    pub const LIKED_SONGS_NAME: &'static str = "Liked Songs";

    pub fn name(&self) -> &str {
        match self {
            CollectionRef::Playlist(p) => &p.name,
            CollectionRef::LikedSongs => Self::LIKED_SONGS_NAME,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CollectionRef::Playlist(p) => &p.description,
            CollectionRef::LikedSongs => "",
        }
    }

    /// Page size accepted by the source for this kind of collection.
    pub fn page_limit(&self) -> u32 {
        match self {
            CollectionRef::Playlist(_) => 100,
            CollectionRef::LikedSongs => 50,
        }
    }
}

/// Which collections a run exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSelection {
    All,
    LikedSongs,
    /// 1-based positions in the playlist listing.
    Indices(Vec<usize>),
}

/// One page of a paginated source listing.
///
/// `dropped` counts raw entries the client could not turn into a [`Track`]
/// (removed tracks, podcast episodes, local files without artist). They still
/// occupy a slot of the page, so the reader adds them back when deciding
/// whether this was the final page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub dropped: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, dropped: 0 }
    }

    pub fn raw_len(&self) -> usize {
        self.items.len() + self.dropped
    }
}

/// A search hit in the destination catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item_id: String,
    pub title: String,
    pub channel_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    Private,
    Unlisted,
    Public,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Private => "private",
            Privacy::Unlisted => "unlisted",
            Privacy::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Spotify,
    YouTube,
}

impl Provider {
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Spotify => "spotify",
            Provider::YouTube => "youtube",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Spotify => f.write_str("Spotify"),
            Provider::YouTube => f.write_str("YouTube"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub index: usize,
    pub name: String,
    pub tracks: String,
}

// Spotify Web API payloads

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPaging<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tracks: Option<SpotifyTracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTracksRef {
    pub total: u32,
}

/// Entry of `/playlists/{id}/tracks` and `/me/tracks`; both wrap the track.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

// YouTube Data API payloads

#[derive(Debug, Clone, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
    pub snippet: Option<SearchSnippet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertPlaylistRequest {
    pub snippet: PlaylistSnippet,
    pub status: PlaylistStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistSnippet {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStatus {
    pub privacy_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubePlaylist {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertPlaylistItemRequest {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub playlist_id: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    pub video_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorDetail {
    #[serde(default)]
    pub reason: String,
}
