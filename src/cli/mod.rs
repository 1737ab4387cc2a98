//! # CLI Module
//!
//! User-facing commands. Each one wires the library pieces together, reports
//! through the console macros and terminates with `error!` (exit code 1) on
//! anything fatal.
//!
//! ## Commands
//!
//! - [`auth`] - OAuth login for Spotify or YouTube
//! - [`list_playlists`] - table of the playlists that can be migrated
//! - [`migrate`] - runs the migration pipeline for a selection
//!
//! ## Usage Patterns
//!
//! ```bash
//! plexport auth spotify
//! plexport auth youtube
//! plexport playlists
//! plexport migrate --select "1 3"          # two playlists
//! plexport migrate --select liked --dry-run
//! ```

mod auth;
mod migrate;
mod playlists;
mod progress;

pub use auth::auth;
pub use migrate::{MigrateOptions, migrate};
pub use playlists::list_playlists;
pub use progress::ConsoleProgress;
