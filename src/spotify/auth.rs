use reqwest::{Client, Url};
use serde_json::Value;

use crate::{
    config,
    error::MigrationError,
    management::{TokenManager, token_from_response},
    server::authorize_in_browser,
    types::{Provider, Token},
    utils,
};

/// Runs the OAuth 2.0 PKCE flow against Spotify and caches the token.
///
/// 1. Generates the code verifier and its S256 challenge
/// 2. Opens the authorization page and waits for the local callback
/// 3. Exchanges the code (plus verifier) for a token
/// 4. Persists the token for later runs
pub async fn auth() -> Result<Token, MigrationError> {
    let client_id = config::spotify_client_id()?;
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let authorize_url = Url::parse_with_params(
        &config::spotify_apiauth_url(),
        &[
            ("client_id", client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config::spotify_redirect_uri().as_str()),
            ("code_challenge", code_challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("scope", config::spotify_scope().as_str()),
        ],
    )
    .map_err(|e| MigrationError::Config(format!("SPOTIFY_API_AUTH_URL: {e}")))?;

    let code = authorize_in_browser(authorize_url).await?;
    let token = exchange_code_pkce(&code, &code_verifier).await?;

    TokenManager::new(Provider::Spotify, token.clone())
        .persist()
        .await?;
    Ok(token)
}

/// Exchanges an authorization code for a token. The verifier proves that the
/// caller started the flow.
pub async fn exchange_code_pkce(code: &str, verifier: &str) -> Result<Token, MigrationError> {
    let client_id = config::spotify_client_id()?;
    let redirect_uri = config::spotify_redirect_uri();

    let client = Client::new();
    let res = client
        .post(config::spotify_apitoken_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await?;

    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        return Err(MigrationError::Auth(format!(
            "Spotify token exchange failed ({status}): {}",
            json["error_description"].as_str().unwrap_or("unknown error")
        )));
    }

    token_from_response(&json, None)
}
