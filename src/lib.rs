//! Spotify to YouTube Playlist Migration Library
//!
//! This library provides the building blocks for migrating playlists and liked
//! songs from a Spotify account to a YouTube account. It includes the source and
//! destination API clients, the OAuth login flows, the migration pipeline and a
//! persistent ledger that keeps repeated runs from duplicating work.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the local OAuth callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by the pipeline and the clients
//! - `logging` - Diagnostic log setup
//! - `management` - Token cache and migration ledger
//! - `pipeline` - Catalog reader, matcher, dispatcher, writer and orchestrator
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client (migration source)
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//! - `youtube` - YouTube Data API client (migration destination)
//!
//! # Example
//!
//! ```
//! use plexport::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> plexport::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod pipeline;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;
pub mod youtube;

/// A convenient Result type alias for operations that may fail.
///
/// Used at the edges of the application (CLI commands, configuration loading)
/// where any error is reported to the user rather than matched on. The
/// pipeline itself returns [`error::MigrationError`].
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Fetching playlists...");
/// info!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Migrated {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Terminates the process with exit code 1 right after printing. Only used by
/// the binary and CLI layer for fatal errors; library code returns errors.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable problems such as a single track that could not be
/// matched or inserted.
///
/// # Example
///
/// ```
/// warning!("No match found for {}", key);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
