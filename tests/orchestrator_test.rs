mod common;

use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{Failure, StubDestination, StubSource, candidate, playlist, track};
use plexport::{
    config::MigrationSettings,
    error::MigrationError,
    management::MigrationLedger,
    pipeline::{
        Dispatcher, Orchestrator, ProgressObserver, RunState, RunSummary, TrackOutcome,
        select_collections,
    },
    types::{CollectionRef, PlaylistSelection, Privacy, Track},
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn road_trip() -> Vec<Track> {
    vec![
        track("Song A", "Artist X"),
        track("Song B", "Artist Y"),
        track("Song C", "Artist X"),
    ]
}

fn settings(ledger: &Path) -> MigrationSettings {
    MigrationSettings {
        ledger_path: ledger.to_path_buf(),
        ..MigrationSettings::default()
    }
}

async fn orchestrator(
    source: Arc<StubSource>,
    destination: Arc<StubDestination>,
    settings: MigrationSettings,
) -> Orchestrator {
    let ledger = Arc::new(MigrationLedger::open(&settings.ledger_path).await.unwrap());
    let cancel = CancellationToken::new();
    let dispatcher = Arc::new(Dispatcher::with_interval(
        Duration::ZERO,
        settings.concurrency,
        cancel.clone(),
    ));
    Orchestrator::new(source, destination, ledger, settings, cancel).with_dispatcher(dispatcher)
}

fn ledger_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_road_trip_end_to_end() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));

    let run = orchestrator(source, destination.clone(), settings(&ledger_path)).await;
    let summary = run.run(&PlaylistSelection::Indices(vec![1])).await.unwrap();

    assert_eq!(
        destination.created(),
        vec![(
            "Road Trip (Migrated)".to_string(),
            "Migrated from Spotify".to_string(),
            Privacy::Private
        )]
    );
    let inserted = destination.inserted();
    assert_eq!(inserted.len(), 3);
    assert!(inserted.iter().all(|(playlist_id, _)| playlist_id == "pl-1"));

    let mut lines = ledger_lines(&ledger_path);
    lines.sort();
    assert_eq!(
        lines,
        vec!["Song A - Artist X", "Song B - Artist Y", "Song C - Artist X"]
    );

    assert_eq!(summary.migrated, 3);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.playlists, 1);
    assert_eq!(run.state(), RunState::Done);
}

#[tokio::test]
async fn test_second_run_adds_nothing() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));

    orchestrator(source.clone(), destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();
    let calls_after_first = destination.total_calls();

    let second = orchestrator(source, destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(destination.total_calls(), calls_after_first);
    assert_eq!(destination.inserted().len(), 3);
    assert_eq!(destination.created().len(), 1);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.migrated, 0);
    assert_eq!(ledger_lines(&ledger_path).len(), 3);
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));
    let mut settings = settings(&ledger_path);
    settings.dry_run = true;

    let summary = orchestrator(source, destination.clone(), settings)
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(destination.total_calls(), 0);
    assert!(!ledger_path.exists());
    assert_eq!(summary.planned, 3);
    assert_eq!(summary.migrated, 0);
}

#[tokio::test]
async fn test_dry_run_leaves_existing_ledger_unchanged() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    std::fs::write(&ledger_path, "Song A - Artist X\n").unwrap();
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));
    let mut settings = settings(&ledger_path);
    settings.dry_run = true;

    let summary = orchestrator(source, destination.clone(), settings)
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&ledger_path).unwrap(),
        "Song A - Artist X\n"
    );
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.planned, 2);
    assert_eq!(destination.total_calls(), 0);
}

#[tokio::test]
async fn test_insert_failure_is_skipped_and_not_recorded() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let mut destination = StubDestination::default().answering_all(&tracks);
    destination
        .insert_failures
        .insert("vid-1".to_string(), Failure::Transient);
    let destination = Arc::new(destination);

    let run = orchestrator(source, destination.clone(), settings(&ledger_path)).await;
    let summary = run.run(&PlaylistSelection::All).await.unwrap();

    assert_eq!(summary.migrated, 2);
    assert_eq!(summary.insert_failed, 1);
    let lines = ledger_lines(&ledger_path);
    assert_eq!(lines.len(), 2);
    assert!(!lines.contains(&"Song B - Artist Y".to_string()));
    assert_eq!(run.state(), RunState::Done);
}

#[tokio::test]
async fn test_unmatched_track_does_not_stop_siblings() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let mut tracks = road_trip();
    let known = tracks.clone();
    tracks.push(track("Obscure", "Nobody"));
    let source =
        Arc::new(StubSource::default().with_playlist(playlist("rt", "Road Trip", 4), tracks));
    let destination = Arc::new(StubDestination::default().answering_all(&known));

    let summary = orchestrator(source, destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(summary.migrated, 3);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.failed(), 1);
    let searches = destination.searches();
    assert!(searches.contains(&"Obscure Nobody topic".to_string()));
    assert!(searches.contains(&"Obscure Nobody".to_string()));
    assert_eq!(ledger_lines(&ledger_path).len(), 3);
}

#[tokio::test]
async fn test_fallback_match_is_counted() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let source = Arc::new(StubSource::default().with_playlist(
        playlist("p", "Mix", 1),
        vec![track("Song A", "Artist X")],
    ));
    let destination = Arc::new(
        StubDestination::default().answer("Song A Artist X", vec![candidate("v", "Fan Uploads")]),
    );

    let summary = orchestrator(source, destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(summary.migrated, 1);
    assert_eq!(summary.fallback_matched, 1);
    assert_eq!(destination.inserted()[0].1, "v");
}

#[tokio::test]
async fn test_source_failure_aborts_before_any_destination_call() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let mut source =
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), road_trip());
    source.unavailable = true;
    let destination = Arc::new(StubDestination::default());

    let run = orchestrator(Arc::new(source), destination.clone(), settings(&ledger_path)).await;
    let result = run.run(&PlaylistSelection::All).await;

    assert!(matches!(result, Err(MigrationError::SourceUnavailable(_))));
    assert_eq!(run.state(), RunState::Aborted);
    assert_eq!(destination.total_calls(), 0);
}

#[tokio::test]
async fn test_partial_page_failure_aborts() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks: Vec<Track> = (0..150).map(|i| track(&format!("S{i}"), "A")).collect();
    let mut source = StubSource::default().with_playlist(playlist("big", "Big", 150), tracks);
    source.fail_at_offset = Some(100);
    let destination = Arc::new(StubDestination::default());

    let run = orchestrator(Arc::new(source), destination.clone(), settings(&ledger_path)).await;

    assert!(matches!(
        run.run(&PlaylistSelection::All).await,
        Err(MigrationError::SourceUnavailable(_))
    ));
    assert_eq!(destination.total_calls(), 0);
}

#[tokio::test]
async fn test_destination_auth_failure_aborts_run() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let mut destination = StubDestination::default().answering_all(&tracks);
    destination
        .search_failures
        .insert("Song B Artist Y topic".to_string(), Failure::Auth);
    let destination = Arc::new(destination);
    let mut settings = settings(&ledger_path);
    settings.preserve_order = true;

    let run = orchestrator(source, destination.clone(), settings).await;
    let result = run.run(&PlaylistSelection::All).await;

    assert!(matches!(
        result,
        Err(MigrationError::DestinationAuthFailure(_))
    ));
    assert_eq!(run.state(), RunState::Aborted);
    // Work finished before the failure stays recorded.
    assert_eq!(ledger_lines(&ledger_path), vec!["Song A - Artist X"]);
    assert_eq!(run.summary().migrated, 1);
    assert!(!destination.searches().contains(&"Song C Artist X topic".to_string()));
}

#[tokio::test]
async fn test_aborted_run_keeps_ledger_skips_in_summary() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    std::fs::write(&ledger_path, "Song A - Artist X\n").unwrap();
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let mut destination = StubDestination::default().answering_all(&tracks);
    destination
        .search_failures
        .insert("Song B Artist Y topic".to_string(), Failure::Auth);
    let mut settings = settings(&ledger_path);
    settings.preserve_order = true;

    let run = orchestrator(source, Arc::new(destination), settings).await;
    let result = run.run(&PlaylistSelection::All).await;

    assert!(matches!(
        result,
        Err(MigrationError::DestinationAuthFailure(_))
    ));
    let summary = run.summary();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.playlists, 1);
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.migrated, 0);
}

#[tokio::test]
async fn test_fatal_create_failure_keeps_skips_in_summary() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    std::fs::write(&ledger_path, "Song A - Artist X\n").unwrap();
    let mut destination = StubDestination::default().answering_all(&road_trip());
    destination.create_failure = Some(Failure::Auth);
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), road_trip()),
    );

    let run = orchestrator(source, Arc::new(destination), settings(&ledger_path)).await;
    let result = run.run(&PlaylistSelection::All).await;

    assert!(result.is_err());
    assert_eq!(run.state(), RunState::Aborted);
    assert_eq!(run.summary().skipped, 1);
    assert_eq!(run.summary().playlists, 1);
}

#[tokio::test]
async fn test_create_failure_skips_playlist_only() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let mut destination = StubDestination::default().answering_all(&road_trip());
    destination.create_failure = Some(Failure::Transient);
    let source = Arc::new(
        StubSource::default()
            .with_playlist(playlist("a", "First", 3), road_trip())
            .with_playlist(playlist("b", "Second", 1), vec![track("Other", "Band")]),
    );

    let summary = orchestrator(source, Arc::new(destination), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(summary.playlists, 2);
    assert_eq!(summary.playlists_failed, 2);
    assert!(ledger_lines(&ledger_path).is_empty());
}

#[tokio::test]
async fn test_liked_songs_across_pages() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let liked: Vec<Track> = (0..120)
        .map(|i| track(&format!("Liked {i}"), "Artist"))
        .collect();
    let source = Arc::new(StubSource::default().with_liked(liked.clone()));
    let destination = Arc::new(StubDestination::default().answering_all(&liked));

    let summary = orchestrator(source.clone(), destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::LikedSongs)
        .await
        .unwrap();

    assert_eq!(summary.migrated, 120);
    assert_eq!(destination.inserted().len(), 120);
    assert_eq!(destination.created()[0].0, "Liked Songs (Migrated)");
    assert_eq!(source.requests().len(), 3);
    assert_eq!(ledger_lines(&ledger_path).len(), 120);
}

#[tokio::test]
async fn test_preserve_order_inserts_in_source_order() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks: Vec<Track> = (0..10).map(|i| track(&format!("T{i}"), "A")).collect();
    let source =
        Arc::new(StubSource::default().with_playlist(playlist("p", "Ordered", 10), tracks.clone()));
    let mut destination = StubDestination::default().answering_all(&tracks);
    destination.latency = Some(Duration::from_millis(1));
    let destination = Arc::new(destination);
    let mut settings = settings(&ledger_path);
    settings.preserve_order = true;

    orchestrator(source, destination.clone(), settings)
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    let order: Vec<String> = destination.inserted().into_iter().map(|(_, v)| v).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("vid-{i}")).collect();
    assert_eq!(order, expected);
}

#[tokio::test]
async fn test_duplicates_within_playlist_are_submitted_once() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = vec![
        track("Song A", "Artist X"),
        track("Song A", "Artist X"),
        track("Song B", "Artist Y"),
    ];
    let source =
        Arc::new(StubSource::default().with_playlist(playlist("p", "Dupes", 3), tracks.clone()));
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));

    let summary = orchestrator(source, destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(summary.migrated, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(destination.inserted().len(), 2);
}

#[tokio::test]
async fn test_track_cap() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks: Vec<Track> = (0..10).map(|i| track(&format!("T{i}"), "A")).collect();
    let source =
        Arc::new(StubSource::default().with_playlist(playlist("p", "Capped", 10), tracks.clone()));
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));
    let mut settings = settings(&ledger_path);
    settings.max_tracks = Some(4);

    let summary = orchestrator(source, destination.clone(), settings)
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 4);
    assert_eq!(destination.inserted().len(), 4);
}

#[tokio::test]
async fn test_cancelled_run_aborts_and_keeps_ledger() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    std::fs::write(&ledger_path, "Song A - Artist X\n").unwrap();
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));

    let ledger = Arc::new(MigrationLedger::open(&ledger_path).await.unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let run = Orchestrator::new(source, destination.clone(), ledger, settings(&ledger_path), cancel);

    let result = run.run(&PlaylistSelection::All).await;

    assert!(matches!(result, Err(MigrationError::DispatchCancelled)));
    assert_eq!(run.state(), RunState::Aborted);
    assert_eq!(destination.total_calls(), 0);
    assert_eq!(ledger_lines(&ledger_path), vec!["Song A - Artist X"]);
}

#[test]
fn test_select_collections() {
    let catalog = vec![playlist("a", "First", 1), playlist("b", "Second", 2)];

    assert_eq!(select_collections(&catalog, &PlaylistSelection::All).len(), 2);
    assert_eq!(
        select_collections(&catalog, &PlaylistSelection::LikedSongs),
        vec![CollectionRef::LikedSongs]
    );
    let picked = select_collections(&catalog, &PlaylistSelection::Indices(vec![2, 7]));
    assert_eq!(picked, vec![CollectionRef::Playlist(catalog[1].clone())]);
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl ProgressObserver for RecordingObserver {
    fn playlist_started(&self, name: &str, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {name} {total}"));
    }

    fn track_finished(&self, outcome: &TrackOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(format!("track {}", outcome.key()));
    }

    fn playlist_finished(&self, name: &str, summary: &RunSummary) {
        self.events
            .lock()
            .unwrap()
            .push(format!("finish {name} {}", summary.migrated));
    }
}

#[tokio::test]
async fn test_observer_sees_every_track() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let tracks = road_trip();
    let source = Arc::new(
        StubSource::default().with_playlist(playlist("rt", "Road Trip", 3), tracks.clone()),
    );
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));
    let observer = Arc::new(RecordingObserver::default());

    orchestrator(source, destination, settings(&ledger_path))
        .await
        .with_observer(observer.clone())
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(events.first().unwrap(), "start Road Trip 3");
    assert_eq!(events.last().unwrap(), "finish Road Trip 3");
    assert_eq!(events.iter().filter(|e| e.starts_with("track ")).count(), 3);
}

#[derive(Default)]
struct OutcomeLog {
    outcomes: Mutex<Vec<TrackOutcome>>,
}

impl ProgressObserver for OutcomeLog {
    fn playlist_started(&self, _name: &str, _total: usize) {}

    fn track_finished(&self, outcome: &TrackOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }

    fn playlist_finished(&self, _name: &str, _summary: &RunSummary) {}
}

#[tokio::test]
async fn test_repeats_are_told_apart_from_ledger_skips() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    std::fs::write(&ledger_path, "Song A - Artist X\n").unwrap();
    let tracks = vec![
        track("Song A", "Artist X"),
        track("Song B", "Artist Y"),
        track("Song B", "Artist Y"),
    ];
    let source =
        Arc::new(StubSource::default().with_playlist(playlist("p", "Mixed", 3), tracks.clone()));
    let destination = Arc::new(StubDestination::default().answering_all(&tracks));
    let log = Arc::new(OutcomeLog::default());

    let summary = orchestrator(source, destination, settings(&ledger_path))
        .await
        .with_observer(log.clone())
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    let outcomes = log.outcomes.lock().unwrap().clone();
    assert!(outcomes.iter().any(|o| matches!(
        o,
        TrackOutcome::SkippedDuplicate { key } if key.as_str() == "Song A - Artist X"
    )));
    assert!(outcomes.iter().any(|o| matches!(
        o,
        TrackOutcome::SkippedRepeat { key } if key.as_str() == "Song B - Artist Y"
    )));
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.migrated, 1);
}

#[test]
fn test_tally_always_lists_every_count() {
    let mut summary = RunSummary::default();
    assert_eq!(
        summary.tally(),
        "0 attempted / 0 migrated / 0 skipped / 0 failed"
    );

    let key = track("Song A", "Artist X").key();
    summary.record(&TrackOutcome::Matched {
        key: key.clone(),
        item_id: "vid-0".to_string(),
    });
    summary.record(&TrackOutcome::SkippedDuplicate { key: key.clone() });
    summary.record(&TrackOutcome::NotFound {
        key,
        query: "Song A Artist X".to_string(),
    });
    assert_eq!(
        summary.tally(),
        "3 attempted / 1 migrated / 1 skipped / 1 failed"
    );
}

#[tokio::test]
async fn test_unmatched_track_is_a_recoverable_miss() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("migrated.txt");
    let source = Arc::new(
        StubSource::default()
            .with_playlist(playlist("p", "Obscure", 1), vec![track("Rare", "Nobody")]),
    );
    let destination = Arc::new(StubDestination::default());

    let summary = orchestrator(source, destination.clone(), settings(&ledger_path))
        .await
        .run(&PlaylistSelection::All)
        .await
        .unwrap();

    assert_eq!(summary.not_found, 1);
    assert!(destination.inserted().is_empty());
    assert!(!MigrationError::NoMatchFound("Rare Nobody".to_string()).is_fatal());
}
