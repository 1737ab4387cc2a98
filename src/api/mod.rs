//! # API Module
//!
//! HTTP endpoints of the local OAuth callback server.
//!
//! A login creates a [`Handshake`] together with its [`CallbackSlot`]. The
//! slot is handed to the `/callback` route, which completes it once with the
//! authorization code from the provider's redirect; the login flow awaits the
//! handshake on the other end.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::get};
//! use plexport::api::{Handshake, callback};
//!
//! let (slot, handshake) = Handshake::new(state);
//! let app = Router::new().route("/callback", get(callback).layer(Extension(slot)));
//! let code = handshake.wait().await?;
//! ```

mod callback;

pub use callback::{CallbackParams, CallbackSlot, Handshake, SlotResponse, callback};
