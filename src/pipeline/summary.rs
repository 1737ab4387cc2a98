use crate::types::TrackKey;

/// What happened to one source track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Matched { key: TrackKey, item_id: String },
    FallbackMatched { key: TrackKey, item_id: String },
    /// Already in the ledger from an earlier run.
    SkippedDuplicate { key: TrackKey },
    /// Appears again later in the same playlist.
    SkippedRepeat { key: TrackKey },
    NotFound { key: TrackKey, query: String },
    InsertFailed { key: TrackKey, reason: String },
    /// Dry run: the track would be searched with `query` and added.
    Planned { key: TrackKey, query: String },
}

impl TrackOutcome {
    pub fn key(&self) -> &TrackKey {
        match self {
            TrackOutcome::Matched { key, .. }
            | TrackOutcome::FallbackMatched { key, .. }
            | TrackOutcome::SkippedDuplicate { key }
            | TrackOutcome::SkippedRepeat { key }
            | TrackOutcome::NotFound { key, .. }
            | TrackOutcome::InsertFailed { key, .. }
            | TrackOutcome::Planned { key, .. } => key,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TrackOutcome::NotFound { .. } | TrackOutcome::InsertFailed { .. }
        )
    }
}

/// Tally of a run (or of one playlist within it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub playlists: usize,
    pub playlists_failed: usize,
    pub attempted: usize,
    pub migrated: usize,
    pub fallback_matched: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub insert_failed: usize,
    pub planned: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &TrackOutcome) {
        self.attempted += 1;
        match outcome {
            TrackOutcome::Matched { .. } => self.migrated += 1,
            TrackOutcome::FallbackMatched { .. } => {
                self.migrated += 1;
                self.fallback_matched += 1;
            }
            TrackOutcome::SkippedDuplicate { .. } | TrackOutcome::SkippedRepeat { .. } => {
                self.skipped += 1
            }
            TrackOutcome::NotFound { .. } => self.not_found += 1,
            TrackOutcome::InsertFailed { .. } => self.insert_failed += 1,
            TrackOutcome::Planned { .. } => self.planned += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.not_found + self.insert_failed
    }

    /// Closing line of a run: attempted, migrated, skipped and failed counts.
    pub fn tally(&self) -> String {
        format!(
            "{} attempted / {} migrated / {} skipped / {} failed",
            self.attempted,
            self.migrated,
            self.skipped,
            self.failed()
        )
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.playlists += other.playlists;
        self.playlists_failed += other.playlists_failed;
        self.attempted += other.attempted;
        self.migrated += other.migrated;
        self.fallback_matched += other.fallback_matched;
        self.skipped += other.skipped;
        self.not_found += other.not_found;
        self.insert_failed += other.insert_failed;
        self.planned += other.planned;
    }
}
