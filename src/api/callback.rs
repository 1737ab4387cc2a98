use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{Extension, extract::Query, response::Html};
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::MigrationError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Query parameters of an OAuth redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

type Outcome = Result<String, String>;

/// Server side of a login handshake. Completes at most once, and only for a
/// redirect carrying the expected `state`.
pub struct CallbackSlot {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResponse {
    Accepted,
    Denied,
    StateMismatch,
    MissingCode,
    AlreadyCompleted,
}

impl CallbackSlot {
    pub fn complete(&self, params: &CallbackParams) -> SlotResponse {
        if params.state.as_deref() != Some(self.expected_state.as_str()) {
            warn!("callback.state_mismatch");
            return SlotResponse::StateMismatch;
        }

        let (outcome, response) = match (&params.code, &params.error) {
            (_, Some(error)) => (Err(error.clone()), SlotResponse::Denied),
            (Some(code), None) => (Ok(code.clone()), SlotResponse::Accepted),
            (None, None) => return SlotResponse::MissingCode,
        };

        let sender = self.sender.lock().ok().and_then(|mut s| s.take());
        match sender {
            Some(sender) => {
                // The waiting side may have timed out already.
                let _ = sender.send(outcome);
                debug!(response = ?response, "callback.completed");
                response
            }
            None => SlotResponse::AlreadyCompleted,
        }
    }
}

/// Client side of a login handshake: resolves with the authorization code.
pub struct Handshake {
    receiver: oneshot::Receiver<Outcome>,
    timeout: Duration,
}

impl Handshake {
    pub fn new(state: impl Into<String>) -> (Arc<CallbackSlot>, Handshake) {
        let (sender, receiver) = oneshot::channel();
        let slot = CallbackSlot {
            expected_state: state.into(),
            sender: Mutex::new(Some(sender)),
        };
        (
            Arc::new(slot),
            Handshake {
                receiver,
                timeout: DEFAULT_TIMEOUT,
            },
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn wait(self) -> Result<String, MigrationError> {
        match tokio::time::timeout(self.timeout, self.receiver).await {
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(denied))) => Err(MigrationError::Auth(format!(
                "authorization denied: {denied}"
            ))),
            Ok(Err(_)) => Err(MigrationError::Auth(
                "callback server stopped before completing the login".to_string(),
            )),
            Err(_) => Err(MigrationError::Auth(format!(
                "no authorization callback within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(slot): Extension<Arc<CallbackSlot>>,
) -> Html<&'static str> {
    match slot.complete(&params) {
        SlotResponse::Accepted => {
            Html("<h2>Authentication successful.</h2><p>You can close this window.</p>")
        }
        SlotResponse::Denied => Html("<h4>Login was denied.</h4>"),
        SlotResponse::StateMismatch => Html("<h4>Invalid state parameter.</h4>"),
        SlotResponse::MissingCode => Html("<h4>Missing authorization code.</h4>"),
        SlotResponse::AlreadyCompleted => Html("<h4>Login already handled.</h4>"),
    }
}
