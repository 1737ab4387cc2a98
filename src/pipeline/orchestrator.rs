//! End-to-end migration run.
//!
//! ```text
//! Idle -> FetchingCatalog -> SelectingPlaylists -> PerPlaylistExport -> Done
//!                                                   |
//!          CreatingPlaylist -> MatchingTrack -> WritingTrack -> (loop | PlaylistComplete)
//! ```
//!
//! Playlists are exported one at a time. Within a playlist a fixed pool of
//! workers drains a shared queue of tracks; every destination call they make
//! goes through the shared [`Dispatcher`]. Per-track problems become
//! [`TrackOutcome`]s, fatal errors stop the pool and abort the run.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::MigrationSettings,
    error::MigrationError,
    management::MigrationLedger,
    pipeline::{
        CatalogReader, DestinationCatalog, Dispatcher, NoProgress, PlaylistWriter,
        ProgressObserver, RunSummary, SourceCatalog, TrackMatcher, TrackOutcome, primary_query,
        relaxed_query,
    },
    types::{CollectionRef, PlaylistHandle, PlaylistSelection, PlaylistSummary, Track},
    utils,
};

pub const DEFAULT_DESCRIPTION: &str = "Migrated from Spotify";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FetchingCatalog,
    SelectingPlaylists,
    PerPlaylistExport(ExportState),
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    CreatingPlaylist,
    MatchingTrack,
    WritingTrack,
    PlaylistComplete,
}

/// Everything a worker needs to migrate one track.
struct TrackWorker {
    matcher: TrackMatcher,
    writer: Arc<PlaylistWriter>,
    ledger: Arc<MigrationLedger>,
    observer: Arc<dyn ProgressObserver>,
    summary: Arc<Mutex<RunSummary>>,
}

impl TrackWorker {
    async fn drain(
        self: Arc<Self>,
        queue: Arc<Mutex<VecDeque<Track>>>,
        handle: PlaylistHandle,
        halt: CancellationToken,
    ) -> Result<(), MigrationError> {
        loop {
            if halt.is_cancelled() {
                return Ok(());
            }
            let next = queue.lock().ok().and_then(|mut q| q.pop_front());
            let Some(track) = next else {
                return Ok(());
            };

            match self.migrate(&handle, track).await {
                Ok(outcome) => self.report(outcome),
                Err(e) => {
                    halt.cancel();
                    return Err(e);
                }
            }
        }
    }

    async fn migrate(
        &self,
        handle: &PlaylistHandle,
        track: Track,
    ) -> Result<TrackOutcome, MigrationError> {
        let key = track.key();

        if self.writer.is_dry_run() {
            return Ok(TrackOutcome::Planned {
                key,
                query: primary_query(&track),
            });
        }

        trace!(track = %key, state = ?ExportState::MatchingTrack, "worker.state");
        let result = self.matcher.match_track(&track).await?;
        let Some(item_id) = result.destination_item_id else {
            let query = relaxed_query(&track);
            let miss = MigrationError::NoMatchFound(query.clone());
            warn!(track = %key, error = %miss, "worker.not_found");
            return Ok(TrackOutcome::NotFound { key, query });
        };

        trace!(track = %key, state = ?ExportState::WritingTrack, "worker.state");
        match self.writer.add_item(handle, &item_id).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Ok(TrackOutcome::InsertFailed {
                    key,
                    reason: e.to_string(),
                });
            }
        }

        self.ledger.record(&key).await?;

        Ok(if result.matched_via_fallback {
            TrackOutcome::FallbackMatched { key, item_id }
        } else {
            TrackOutcome::Matched { key, item_id }
        })
    }

    fn report(&self, outcome: TrackOutcome) {
        self.observer.track_finished(&outcome);
        if let Ok(mut summary) = self.summary.lock() {
            summary.record(&outcome);
        }
    }
}

pub struct Orchestrator {
    source: Arc<dyn SourceCatalog>,
    reader: CatalogReader,
    writer: Arc<PlaylistWriter>,
    ledger: Arc<MigrationLedger>,
    dispatcher: Arc<Dispatcher>,
    destination: Arc<dyn DestinationCatalog>,
    observer: Arc<dyn ProgressObserver>,
    settings: MigrationSettings,
    cancel: CancellationToken,
    state: Mutex<RunState>,
    totals: Mutex<RunSummary>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn SourceCatalog>,
        destination: Arc<dyn DestinationCatalog>,
        ledger: Arc<MigrationLedger>,
        settings: MigrationSettings,
        cancel: CancellationToken,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            settings.rate_per_second,
            settings.concurrency,
            cancel.clone(),
        ));
        let writer = Arc::new(PlaylistWriter::new(
            destination.clone(),
            dispatcher.clone(),
            settings.dry_run,
        ));

        Self {
            reader: CatalogReader::new(source.clone()),
            source,
            writer,
            ledger,
            dispatcher,
            destination,
            observer: Arc::new(NoProgress),
            settings,
            cancel,
            state: Mutex::new(RunState::Idle),
            totals: Mutex::new(RunSummary::default()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the dispatcher built from the settings.
    pub fn with_dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.writer = Arc::new(PlaylistWriter::new(
            self.destination.clone(),
            dispatcher.clone(),
            self.settings.dry_run,
        ));
        self.dispatcher = dispatcher;
        self
    }

    pub fn state(&self) -> RunState {
        self.state.lock().map(|s| *s).unwrap_or(RunState::Aborted)
    }

    /// Counts accumulated so far; still meaningful after an aborted run.
    pub fn summary(&self) -> RunSummary {
        self.totals.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn transition(&self, next: RunState) {
        if let Ok(mut state) = self.state.lock() {
            debug!(from = ?*state, to = ?next, "orchestrator.transition");
            *state = next;
        }
    }

    fn add_to_totals(&self, summary: &RunSummary) {
        if let Ok(mut totals) = self.totals.lock() {
            totals.merge(summary);
        }
    }

    fn abort<T>(&self, error: MigrationError) -> Result<T, MigrationError> {
        warn!(error = %error, "orchestrator.abort");
        self.transition(RunState::Aborted);
        Err(error)
    }

    /// Lists the source playlists the user can pick from.
    pub async fn fetch_catalog(&self) -> Result<Vec<PlaylistSummary>, MigrationError> {
        self.transition(RunState::FetchingCatalog);
        match self.source.list_playlists().await {
            Ok(playlists) => Ok(playlists),
            Err(MigrationError::SourceUnavailable(reason)) => {
                self.abort(MigrationError::SourceUnavailable(reason))
            }
            Err(other) => self.abort(MigrationError::SourceUnavailable(other.to_string())),
        }
    }

    /// Full run: fetch the playlist catalog when the selection needs it, then
    /// export the selected collections.
    pub async fn run(&self, selection: &PlaylistSelection) -> Result<RunSummary, MigrationError> {
        let catalog = match selection {
            PlaylistSelection::LikedSongs => {
                self.transition(RunState::FetchingCatalog);
                Vec::new()
            }
            _ => self.fetch_catalog().await?,
        };
        self.run_selected(&catalog, selection).await
    }

    /// Exports the collections `selection` picks out of `catalog`.
    pub async fn run_selected(
        &self,
        catalog: &[PlaylistSummary],
        selection: &PlaylistSelection,
    ) -> Result<RunSummary, MigrationError> {
        self.transition(RunState::SelectingPlaylists);
        let collections = select_collections(catalog, selection);
        info!(count = collections.len(), "orchestrator.selected");

        for collection in &collections {
            if self.cancel.is_cancelled() {
                return self.abort(MigrationError::DispatchCancelled);
            }
            match self.export_collection(collection).await {
                Ok(summary) => self.add_to_totals(&summary),
                Err(e) => return self.abort(e),
            }
        }

        self.transition(RunState::Done);
        Ok(self.summary())
    }

    async fn export_collection(
        &self,
        collection: &CollectionRef,
    ) -> Result<RunSummary, MigrationError> {
        let name = collection.name().to_string();
        let mut tracks = self.reader.fetch_all(collection).await?;
        if let Some(cap) = self.settings.max_tracks {
            if tracks.len() > cap {
                warn!(playlist = %name, total = tracks.len(), cap, "orchestrator.track_cap");
                tracks.truncate(cap);
            }
        }

        let mut summary = RunSummary {
            playlists: 1,
            ..RunSummary::default()
        };
        self.observer.playlist_started(&name, tracks.len());

        // Already-migrated and repeated tracks never reach the matcher.
        let mut seen = HashSet::new();
        let mut pending: VecDeque<Track> = VecDeque::new();
        for track in tracks {
            let key = track.key();
            let outcome = if !seen.insert(key.clone()) {
                TrackOutcome::SkippedRepeat { key }
            } else if self.ledger.contains(&key).await {
                TrackOutcome::SkippedDuplicate { key }
            } else {
                pending.push_back(track);
                continue;
            };
            self.observer.track_finished(&outcome);
            summary.record(&outcome);
        }

        if pending.is_empty() {
            info!(playlist = %name, "orchestrator.nothing_pending");
            self.observer.playlist_finished(&name, &summary);
            return Ok(summary);
        }

        self.transition(RunState::PerPlaylistExport(ExportState::CreatingPlaylist));
        let description = match collection.description().trim() {
            "" => DEFAULT_DESCRIPTION,
            text => text,
        };
        let handle = match self
            .writer
            .create_playlist(&utils::migrated_title(&name), description)
            .await
        {
            Ok(handle) => handle,
            Err(e) if e.is_fatal() => {
                self.add_to_totals(&summary);
                return Err(e);
            }
            Err(e) => {
                warn!(playlist = %name, error = %e, "orchestrator.create_failed");
                summary.playlists_failed += 1;
                self.observer.playlist_finished(&name, &summary);
                return Ok(summary);
            }
        };

        self.transition(RunState::PerPlaylistExport(ExportState::MatchingTrack));
        let (track_summary, failure) = self.run_workers(handle, pending).await;
        summary.merge(&track_summary);
        if let Some(e) = failure {
            // Skips from the pre-pass count toward the aborted run's tally too.
            self.add_to_totals(&summary);
            return Err(e);
        }

        self.transition(RunState::PerPlaylistExport(ExportState::PlaylistComplete));
        self.observer.playlist_finished(&name, &summary);
        Ok(summary)
    }

    /// Drains `pending` with the worker pool. Returns what the workers
    /// finished along with the error that stopped them, if any.
    async fn run_workers(
        &self,
        handle: PlaylistHandle,
        pending: VecDeque<Track>,
    ) -> (RunSummary, Option<MigrationError>) {
        let summary = Arc::new(Mutex::new(RunSummary::default()));
        let worker = Arc::new(TrackWorker {
            matcher: TrackMatcher::new(
                self.destination.clone(),
                self.dispatcher.clone(),
                self.settings.search_results,
            ),
            writer: self.writer.clone(),
            ledger: self.ledger.clone(),
            observer: self.observer.clone(),
            summary: summary.clone(),
        });

        let workers = self.settings.effective_workers().min(pending.len()).max(1);
        let queue = Arc::new(Mutex::new(pending));
        let halt = self.cancel.child_token();

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(
                worker
                    .clone()
                    .drain(queue.clone(), handle.clone(), halt.clone()),
            );
        }
        debug!(workers, "orchestrator.pool.started");

        let mut failure: Option<MigrationError> = None;
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    // Keep the root cause rather than the cancellations it triggers.
                    let replace = match &failure {
                        None => true,
                        Some(MigrationError::DispatchCancelled) => {
                            !matches!(e, MigrationError::DispatchCancelled)
                        }
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(e);
                    }
                }
                Err(join_error) if join_error.is_panic() => {
                    std::panic::resume_unwind(join_error.into_panic())
                }
                Err(_) => {}
            }
        }

        let finished = summary.lock().map(|s| s.clone()).unwrap_or_default();
        (finished, failure)
    }
}

/// Resolves a selection against the source catalog. Out-of-range indices are
/// skipped.
pub fn select_collections(
    catalog: &[PlaylistSummary],
    selection: &PlaylistSelection,
) -> Vec<CollectionRef> {
    match selection {
        PlaylistSelection::All => catalog.iter().cloned().map(CollectionRef::Playlist).collect(),
        PlaylistSelection::LikedSongs => vec![CollectionRef::LikedSongs],
        PlaylistSelection::Indices(indices) => indices
            .iter()
            .filter_map(|&index| {
                let found = index
                    .checked_sub(1)
                    .and_then(|i| catalog.get(i))
                    .cloned()
                    .map(CollectionRef::Playlist);
                if found.is_none() {
                    warn!(index, available = catalog.len(), "orchestrator.invalid_index");
                }
                found
            })
            .collect(),
    }
}
