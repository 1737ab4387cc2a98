use crate::{error, spotify, success, types::Provider, youtube};

pub async fn auth(provider: Provider) {
    let result = match provider {
        Provider::Spotify => spotify::auth::auth().await,
        Provider::YouTube => youtube::auth::auth().await,
    };

    match result {
        Ok(_) => success!("Authentication with {} successful!", provider),
        Err(e) => error!("Authentication with {} failed: {}", provider, e),
    }
}
