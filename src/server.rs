use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Extension, Router, routing::get};
use reqwest::Url;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    api::{self, CallbackSlot, Handshake},
    config,
    error::MigrationError,
    info, utils, warning,
};

/// Binds the callback server and serves it in the background until
/// `shutdown` is cancelled.
pub async fn start_api_server(
    slot: Arc<CallbackSlot>,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>, MigrationError> {
    let app = Router::new().route("/callback", get(api::callback).layer(Extension(slot)));

    let addr = SocketAddr::from_str(&config::server_addr()).map_err(|e| {
        MigrationError::Config(format!("SERVER_ADDRESS is not a socket address: {e}"))
    })?;
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        MigrationError::Auth(format!("cannot bind callback server on {addr}: {e}"))
    })?;
    debug!(%addr, "server.listening");

    Ok(tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(e) = served {
            warn!(error = %e, "server.failed");
        }
    }))
}

/// Runs the browser half of an authorization code flow.
///
/// Adds a fresh `state` to `authorize_url`, serves the callback route, opens
/// the browser and waits for the redirect. Returns the authorization code.
pub async fn authorize_in_browser(mut authorize_url: Url) -> Result<String, MigrationError> {
    let state = utils::generate_state();
    authorize_url.query_pairs_mut().append_pair("state", &state);

    let (slot, handshake) = Handshake::new(state);
    let shutdown = CancellationToken::new();
    let server = start_api_server(slot, shutdown.clone()).await?;

    if webbrowser::open(authorize_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            authorize_url
        );
    } else {
        info!("Waiting for authorization in the browser...");
    }

    let code = handshake.wait().await;
    shutdown.cancel();
    let _ = server.await;
    code
}
