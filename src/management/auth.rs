use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config,
    error::MigrationError,
    types::{Provider, Token},
};

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_MARGIN_SECS: u64 = 240;

/// Cached OAuth token of one provider, refreshed on demand.
pub struct TokenManager {
    provider: Provider,
    token: Token,
}

impl TokenManager {
    pub fn new(provider: Provider, token: Token) -> Self {
        TokenManager { provider, token }
    }

    /// Loads the cached token of `provider`. A missing cache means the user
    /// never logged in.
    pub async fn load(provider: Provider) -> Result<Self, MigrationError> {
        let path = Self::token_path(provider);
        let content = async_fs::read_to_string(&path).await.map_err(|e| {
            MigrationError::Auth(format!(
                "no {provider} token at {} ({e}); run `plexport auth {}` first",
                path.display(),
                provider.slug()
            ))
        })?;
        let token: Token = serde_json::from_str(&content)?;
        Ok(Self { provider, token })
    }

    pub async fn persist(&self) -> Result<(), MigrationError> {
        self.persist_to(&Self::token_path(self.provider)).await
    }

    /// Writes the token cache to `path`. IO failures are auth errors, not
    /// ledger errors.
    pub async fn persist_to(&self, path: &Path) -> Result<(), MigrationError> {
        let cache_error = |e: std::io::Error| {
            MigrationError::Auth(format!(
                "failed to save {} token to {}: {e}",
                self.provider,
                path.display()
            ))
        };
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await.map_err(cache_error)?;
        }

        let json = serde_json::to_string_pretty(&self.token)?;
        async_fs::write(path, json).await.map_err(cache_error)?;
        debug!(provider = self.provider.slug(), path = %path.display(), "token.persisted");
        Ok(())
    }

    /// Current access token, refreshed first when it is about to expire.
    pub async fn get_valid_token(&mut self) -> Result<String, MigrationError> {
        if self.is_expired() {
            let fresh = self.refresh_token().await?;
            self.token = fresh;
            if let Err(e) = self.persist().await {
                warn!(provider = self.provider.slug(), error = %e, "token.persist_failed");
            }
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp().max(0) as u64;
        now + EXPIRY_MARGIN_SECS >= self.token.obtained_at + self.token.expires_in
    }

    async fn refresh_token(&self) -> Result<Token, MigrationError> {
        if self.token.refresh_token.is_empty() {
            return Err(MigrationError::Auth(format!(
                "{} token expired and has no refresh token; run `plexport auth {}`",
                self.provider,
                self.provider.slug()
            )));
        }

        let client = Client::new();
        let request = match self.provider {
            Provider::Spotify => {
                let client_id = config::spotify_client_id()?;
                client.post(config::spotify_apitoken_url()).form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", self.token.refresh_token.as_str()),
                    ("client_id", client_id.as_str()),
                ])
            }
            Provider::YouTube => {
                let client_id = config::youtube_client_id()?;
                let client_secret = config::youtube_client_secret()?;
                client.post(config::google_token_url()).form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", self.token.refresh_token.as_str()),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                ])
            }
        };

        let res = request.send().await?;
        let status = res.status();
        let json: Value = res.json().await?;
        if !status.is_success() {
            return Err(MigrationError::Auth(format!(
                "{} token refresh failed ({status}): {}",
                self.provider,
                json["error_description"]
                    .as_str()
                    .or(json["error"].as_str())
                    .unwrap_or("unknown error")
            )));
        }

        debug!(provider = self.provider.slug(), "token.refreshed");
        token_from_response(&json, Some(&self.token.refresh_token))
    }

    /// `<data_local_dir>/plexport/cache/<provider>-token.json`
    pub fn token_path(provider: Provider) -> PathBuf {
        let mut path = config::app_dir();
        path.push("cache");
        path.push(format!("{}-token.json", provider.slug()));
        path
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}

/// Builds a [`Token`] from an OAuth token endpoint response.
///
/// Refresh responses may omit `refresh_token` (Google always does); the
/// `previous_refresh` token is kept in that case.
pub fn token_from_response(
    json: &Value,
    previous_refresh: Option<&str>,
) -> Result<Token, MigrationError> {
    let access_token = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MigrationError::Auth("token response without access_token".to_string()))?;

    let refresh_token = json["refresh_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .or(previous_refresh)
        .unwrap_or_default();

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp().max(0) as u64,
    })
}
