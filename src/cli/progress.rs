use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    info,
    pipeline::{ProgressObserver, RunSummary, TrackOutcome},
    success, warning,
};

/// Progress bar per playlist with one line per finished track printed above
/// it.
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
    done: AtomicUsize,
    total: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    fn print_outcome(&self, position: usize, total: usize, outcome: &TrackOutcome) {
        match outcome {
            TrackOutcome::Matched { key, .. } => {
                success!("[{position}/{total}] {key}")
            }
            TrackOutcome::FallbackMatched { key, .. } => {
                success!("[{position}/{total}] {key} (fallback search)")
            }
            TrackOutcome::SkippedDuplicate { key } => {
                info!("[{position}/{total}] Skipping (already migrated): {key}")
            }
            TrackOutcome::SkippedRepeat { key } => {
                info!("[{position}/{total}] Skipping (repeated in playlist): {key}")
            }
            TrackOutcome::NotFound { key, query } => {
                warning!("[{position}/{total}] Not found: {key} (last query: {query})")
            }
            TrackOutcome::InsertFailed { key, reason } => {
                warning!("[{position}/{total}] Failed to add {key}: {reason}")
            }
            TrackOutcome::Planned { key, query } => {
                info!("[{position}/{total}] Dry run: would search \"{query}\" for {key}")
            }
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleProgress {
    fn playlist_started(&self, name: &str, total: usize) {
        info!("Exporting {name} ({total} tracks)");
        self.done.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn track_finished(&self, outcome: &TrackOutcome) {
        let position = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);

        match self.bar.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(pb) => {
                    pb.suspend(|| self.print_outcome(position, total, outcome));
                    pb.inc(1);
                }
                None => self.print_outcome(position, total, outcome),
            },
            Err(_) => self.print_outcome(position, total, outcome),
        }
    }

    fn playlist_finished(&self, name: &str, summary: &RunSummary) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }

        if summary.playlists_failed > 0 {
            warning!("Could not create a playlist for {name}");
        } else if summary.planned > 0 {
            info!("Dry run of {name}: {} tracks planned", summary.planned);
        } else {
            success!(
                "Finished {name}: {} migrated / {} failed / {} skipped",
                summary.migrated,
                summary.failed(),
                summary.skipped
            );
        }
    }
}
