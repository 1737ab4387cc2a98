//! # YouTube Integration Module
//!
//! The migration destination: search, playlist creation and item insertion
//! through the YouTube Data API v3, plus the Google login in [`auth`].
//!
//! ## API Coverage
//!
//! - `GET /search?part=snippet&type=video` - candidates for a track
//! - `POST /playlists?part=snippet,status` - create the target playlist
//! - `POST /playlistItems?part=snippet` - append one video
//!
//! ## Error Handling
//!
//! `429` and `5xx` responses are retried with exponential backoff and random
//! jitter, honouring `Retry-After` when present. What remains is classified by
//! [`classify_error`]: rejected credentials are fatal for the run, everything
//! else (quota, bad request, not found) only fails the current call.

pub mod auth;
mod client;

pub use client::{YouTubeClient, classify_error};
