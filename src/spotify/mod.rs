//! # Spotify Integration Module
//!
//! The migration source. Implements [`crate::pipeline::SourceCatalog`] on top
//! of the Spotify Web API and provides the PKCE login that produces the token
//! the client runs on.
//!
//! ## Architecture
//!
//! ```text
//! Pipeline (CatalogReader, Orchestrator)
//!          ↓
//! SpotifyClient (SourceCatalog)
//!     ├── Authentication (OAuth 2.0 PKCE, auth.rs)
//!     └── Library reads (playlists, playlist tracks, saved tracks)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## API Coverage
//!
//! - `GET /me/playlists` - the user's playlists, followed via `next`
//! - `GET /playlists/{id}/tracks` - one page of a playlist
//! - `GET /me/tracks` - one page of the liked songs
//! - `POST /api/token` - code exchange and refresh
//!
//! ## Error Handling
//!
//! Requests are made once. A `429 Too Many Requests` whose `Retry-After` is at
//! most 120 seconds is waited out and the request repeated a single time.
//! Everything else that fails (transport errors, 401/403, other statuses,
//! undecodable bodies) is reported as
//! [`MigrationError::SourceUnavailable`](crate::error::MigrationError::SourceUnavailable):
//! a migration must never proceed on a partially read catalog.
//!
//! Entries that cannot become a [`Track`](crate::types::Track) (removed
//! tracks, podcast episodes, local files without artist) are counted as
//! dropped on their page instead of failing it.

pub mod auth;
mod client;

pub use client::{SpotifyClient, tracks_page};
