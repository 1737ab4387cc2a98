use std::sync::Arc;

use tracing::debug;

use crate::{
    error::MigrationError,
    pipeline::SourceCatalog,
    types::{CollectionRef, Page, Track},
};

/// Reads a whole source collection, page by page.
pub struct CatalogReader {
    source: Arc<dyn SourceCatalog>,
}

impl CatalogReader {
    pub fn new(source: Arc<dyn SourceCatalog>) -> Self {
        Self { source }
    }

    /// Fetches every track of `collection` in source order.
    ///
    /// Pages are requested with the collection's fixed page size until one
    /// comes back with fewer raw entries than that size. Any failed page fails
    /// the whole fetch; a partial catalog would silently produce an incomplete
    /// migration.
    pub async fn fetch_all(&self, collection: &CollectionRef) -> Result<Vec<Track>, MigrationError> {
        let limit = collection.page_limit();
        let mut offset: u32 = 0;
        let mut tracks: Vec<Track> = Vec::new();

        loop {
            let page = self
                .fetch_page(collection, offset, limit)
                .await
                .map_err(|e| match e {
                    MigrationError::SourceUnavailable(_) => e,
                    other => MigrationError::SourceUnavailable(format!(
                        "{name} at offset {offset}: {other}",
                        name = collection.name()
                    )),
                })?;

            let raw_len = page.raw_len();
            debug!(
                collection = collection.name(),
                offset,
                received = raw_len,
                dropped = page.dropped,
                "reader.page"
            );
            tracks.extend(page.items);

            if raw_len < limit as usize {
                break;
            }
            offset += limit;
        }

        Ok(tracks)
    }

    async fn fetch_page(
        &self,
        collection: &CollectionRef,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, MigrationError> {
        match collection {
            CollectionRef::Playlist(playlist) => {
                self.source
                    .list_playlist_tracks(&playlist.id, offset, limit)
                    .await
            }
            CollectionRef::LikedSongs => self.source.list_saved_tracks(offset, limit).await,
        }
    }
}
