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

/// Google OAuth 2.0 for installed applications.
///
/// Uses PKCE on top of the client secret. `access_type=offline` together with
/// `prompt=consent` makes Google issue a refresh token on every login, so the
/// cached token survives beyond the first hour.
pub async fn auth() -> Result<Token, MigrationError> {
    let client_id = config::youtube_client_id()?;
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let authorize_url = Url::parse_with_params(
        &config::google_auth_url(),
        &[
            ("client_id", client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config::youtube_redirect_uri().as_str()),
            ("scope", config::youtube_scope().as_str()),
            ("code_challenge", code_challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| MigrationError::Config(format!("GOOGLE_AUTH_URL: {e}")))?;

    let code = authorize_in_browser(authorize_url).await?;
    let token = exchange_code(&code, &code_verifier).await?;

    TokenManager::new(Provider::YouTube, token.clone())
        .persist()
        .await?;
    Ok(token)
}

pub async fn exchange_code(code: &str, verifier: &str) -> Result<Token, MigrationError> {
    let client_id = config::youtube_client_id()?;
    let client_secret = config::youtube_client_secret()?;
    let redirect_uri = config::youtube_redirect_uri();

    let res = Client::new()
        .post(config::google_token_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
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
            "Google token exchange failed ({status}): {}",
            json["error_description"]
                .as_str()
                .or(json["error"].as_str())
                .unwrap_or("unknown error")
        )));
    }

    let token = token_from_response(&json, None)?;
    if token.refresh_token.is_empty() {
        return Err(MigrationError::Auth(
            "Google did not return a refresh token; revoke the app's access and log in again"
                .to_string(),
        ));
    }
    Ok(token)
}
