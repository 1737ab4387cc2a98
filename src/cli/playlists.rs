use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    error,
    error::MigrationError,
    pipeline::SourceCatalog,
    spotify::SpotifyClient,
    types::PlaylistSummary,
    utils,
};

/// Prints the playlists that can be migrated. Index `0` is Liked Songs.
pub async fn list_playlists() {
    match fetch_playlists().await {
        Ok(playlists) => print_playlists(&playlists),
        Err(e) => error!("Failed to fetch playlists: {}", e),
    }
}

pub(crate) async fn fetch_playlists() -> Result<Vec<PlaylistSummary>, MigrationError> {
    let client = SpotifyClient::connect().await?;

    let pb = ProgressBar::new_spinner();
    pb.set_message("Fetching playlists...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let result = client.list_playlists().await;
    pb.finish_and_clear();
    result
}

pub(crate) fn print_playlists(playlists: &[PlaylistSummary]) {
    let table = Table::new(utils::playlist_table_rows(playlists));
    println!("{}", table);
}
