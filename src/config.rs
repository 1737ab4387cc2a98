//! Configuration management for the playlist migration tool.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. Endpoint URLs and pipeline limits have
//! defaults; client credentials must be provided by the user.
//!
//! The lookup order is:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::error::MigrationError;

/// Loads environment variables from `plexport/.env` in the local data directory.
///
/// Creates the directory if needed. A missing `.env` file is not an error;
/// variables that are already set in the process environment are never
/// overridden.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/plexport/.env`
/// - macOS: `~/Library/Application Support/plexport/.env`
/// - Windows: `%LOCALAPPDATA%/plexport/.env`
pub async fn load_env() -> Result<(), String> {
    let path = app_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Root directory for everything the tool persists (tokens, ledger, `.env`).
pub fn app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("plexport");
    path
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn require(name: &str) -> Result<String, MigrationError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MigrationError::Config(format!("{name} must be set"))),
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, MigrationError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| MigrationError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Address the OAuth callback server binds to, e.g. `127.0.0.1:8080`.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", "127.0.0.1:8080")
}

/// Client ID of the Spotify application. PKCE flow, so no secret is needed.
pub fn spotify_client_id() -> Result<String, MigrationError> {
    require("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Must match a redirect URI registered for the Spotify application.
pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_API_REDIRECT_URI", "http://127.0.0.1:8080/callback")
}

pub fn spotify_scope() -> String {
    var_or(
        "SPOTIFY_API_AUTH_SCOPE",
        "playlist-read-private user-library-read",
    )
}

pub fn spotify_apiauth_url() -> String {
    var_or(
        "SPOTIFY_API_AUTH_URL",
        "https://accounts.spotify.com/authorize",
    )
}

pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", "https://api.spotify.com/v1")
}

pub fn spotify_apitoken_url() -> String {
    var_or(
        "SPOTIFY_API_TOKEN_URL",
        "https://accounts.spotify.com/api/token",
    )
}

/// OAuth client ID of the Google Cloud project (desktop application type).
pub fn youtube_client_id() -> Result<String, MigrationError> {
    require("YOUTUBE_CLIENT_ID")
}

/// Google requires the client secret even for installed applications.
///
/// # Security Note
///
/// Keep it out of logs and version control.
pub fn youtube_client_secret() -> Result<String, MigrationError> {
    require("YOUTUBE_CLIENT_SECRET")
}

pub fn youtube_redirect_uri() -> String {
    var_or("YOUTUBE_REDIRECT_URI", "http://127.0.0.1:8080/callback")
}

pub fn youtube_scope() -> String {
    var_or("YOUTUBE_SCOPE", "https://www.googleapis.com/auth/youtube")
}

pub fn youtube_apiurl() -> String {
    var_or("YOUTUBE_API_URL", "https://www.googleapis.com/youtube/v3")
}

pub fn google_auth_url() -> String {
    var_or(
        "GOOGLE_AUTH_URL",
        "https://accounts.google.com/o/oauth2/v2/auth",
    )
}

pub fn google_token_url() -> String {
    var_or("GOOGLE_TOKEN_URL", "https://oauth2.googleapis.com/token")
}

/// Tuning knobs of a migration run.
///
/// Defaults follow the destination quota guidance: at most 5 calls per
/// second, 5 in flight, 5 workers, 5 search candidates per query.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub rate_per_second: u32,
    pub concurrency: usize,
    pub workers: usize,
    pub search_results: u32,
    pub ledger_path: PathBuf,
    pub max_tracks: Option<usize>,
    pub dry_run: bool,
    pub preserve_order: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            rate_per_second: 5,
            concurrency: 5,
            workers: 5,
            search_results: 5,
            ledger_path: app_dir().join("migrated.txt"),
            max_tracks: None,
            dry_run: false,
            preserve_order: false,
        }
    }
}

impl MigrationSettings {
    /// Reads the `MIGRATE_*` variables on top of [`MigrationSettings::default`].
    pub fn from_env() -> Result<Self, MigrationError> {
        let defaults = Self::default();
        let max_tracks = match env::var("MIGRATE_MAX_TRACKS") {
            Ok(_) => Some(parse_var("MIGRATE_MAX_TRACKS", 0usize)?),
            Err(_) => None,
        };

        let settings = Self {
            rate_per_second: parse_var("MIGRATE_RATE_PER_SECOND", defaults.rate_per_second)?,
            concurrency: parse_var("MIGRATE_CONCURRENCY", defaults.concurrency)?,
            workers: parse_var("MIGRATE_WORKERS", defaults.workers)?,
            search_results: parse_var("MIGRATE_SEARCH_RESULTS", defaults.search_results)?,
            ledger_path: env::var("MIGRATE_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ledger_path),
            max_tracks,
            dry_run: false,
            preserve_order: false,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.rate_per_second == 0 {
            return Err(MigrationError::Config(
                "MIGRATE_RATE_PER_SECOND must be greater than 0".to_string(),
            ));
        }
        if self.concurrency == 0 || self.workers == 0 {
            return Err(MigrationError::Config(
                "MIGRATE_CONCURRENCY and MIGRATE_WORKERS must be greater than 0".to_string(),
            ));
        }
        if self.search_results == 0 {
            return Err(MigrationError::Config(
                "MIGRATE_SEARCH_RESULTS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimum spacing between the start of two destination calls.
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(1) / self.rate_per_second.max(1)
    }

    /// Worker count actually used for a playlist; one when order must be kept.
    pub fn effective_workers(&self) -> usize {
        if self.preserve_order { 1 } else { self.workers.max(1) }
    }
}
