//! Capabilities the pipeline needs from the two services.
//!
//! Both traits describe an already authenticated client. The concrete HTTP
//! implementations live in [`crate::spotify`] and [`crate::youtube`]; tests
//! plug in in-memory stubs.

use async_trait::async_trait;

use crate::{
    error::MigrationError,
    types::{Candidate, Page, PlaylistHandle, PlaylistSummary, Privacy, Track},
};

#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Every playlist of the signed-in user, in source order.
    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, MigrationError>;

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, MigrationError>;

    async fn list_saved_tracks(&self, offset: u32, limit: u32)
    -> Result<Page<Track>, MigrationError>;
}

#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<Candidate>, MigrationError>;

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<PlaylistHandle, MigrationError>;

    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        item_id: &str,
    ) -> Result<(), MigrationError>;
}
