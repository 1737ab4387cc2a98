use crate::pipeline::{RunSummary, TrackOutcome};

/// Receives progress events from the orchestrator.
///
/// Called from worker tasks, so implementations must be cheap and
/// thread-safe. Rendering (progress bars, log lines) is entirely up to the
/// implementation.
pub trait ProgressObserver: Send + Sync {
    fn playlist_started(&self, name: &str, total: usize);
    fn track_finished(&self, outcome: &TrackOutcome);
    fn playlist_finished(&self, name: &str, summary: &RunSummary);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn playlist_started(&self, _name: &str, _total: usize) {}
    fn track_finished(&self, _outcome: &TrackOutcome) {}
    fn playlist_finished(&self, _name: &str, _summary: &RunSummary) {}
}
