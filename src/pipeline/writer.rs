use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::MigrationError,
    pipeline::{DestinationCatalog, Dispatcher},
    types::{PlaylistHandle, Privacy},
};

/// Creates destination playlists and appends items to them.
///
/// In dry-run mode nothing reaches the destination: creation returns a
/// synthetic handle and inserts succeed after logging what would happen.
pub struct PlaylistWriter {
    destination: Arc<dyn DestinationCatalog>,
    dispatcher: Arc<Dispatcher>,
    privacy: Privacy,
    dry_run: bool,
}

impl PlaylistWriter {
    pub fn new(
        destination: Arc<dyn DestinationCatalog>,
        dispatcher: Arc<Dispatcher>,
        dry_run: bool,
    ) -> Self {
        Self {
            destination,
            dispatcher,
            privacy: Privacy::Private,
            dry_run,
        }
    }

    pub fn with_privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistHandle, MigrationError> {
        if self.dry_run {
            info!(name, "writer.dry_run.create_playlist");
            return Ok(PlaylistHandle::dry_run());
        }

        let handle = self
            .dispatcher
            .run(|| {
                self.destination
                    .create_playlist(name, description, self.privacy)
            })
            .await?;
        info!(name, id = %handle.destination_playlist_id, "writer.playlist.created");
        Ok(handle)
    }

    /// Appends one item. Non-fatal failures come back as
    /// [`MigrationError::InsertFailure`] so the caller can skip the item.
    pub async fn add_item(
        &self,
        handle: &PlaylistHandle,
        item_id: &str,
    ) -> Result<(), MigrationError> {
        if self.dry_run {
            info!(
                playlist = %handle.destination_playlist_id,
                item = item_id,
                "writer.dry_run.add_item"
            );
            return Ok(());
        }

        self.dispatcher
            .run(|| {
                self.destination
                    .insert_playlist_item(&handle.destination_playlist_id, item_id)
            })
            .await
            .map_err(|e| {
                if e.is_fatal() {
                    e
                } else {
                    warn!(item = item_id, error = %e, "writer.insert.failed");
                    MigrationError::InsertFailure(format!("{item_id}: {e}"))
                }
            })
    }
}
