use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    error::MigrationError,
    pipeline::{DestinationCatalog, Dispatcher},
    types::{Candidate, MatchResult, Track},
};

/// Channel-name marker of the auto-generated "Artist - Topic" channels that
/// carry official audio uploads.
pub const TOPIC_MARKER: &str = "- Topic";

/// `"<title> <artist> topic"`; the suffix steers search towards official
/// uploads instead of covers and live versions.
pub fn primary_query(track: &Track) -> String {
    format!("{} {} topic", track.title, track.primary_artist)
}

pub fn relaxed_query(track: &Track) -> String {
    format!("{} {}", track.title, track.primary_artist)
}

/// First candidate from a topic channel, otherwise the first candidate.
pub fn select_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .find(|c| c.channel_title.contains(TOPIC_MARKER))
        .or_else(|| candidates.first())
}

/// Maps a source track to a destination item through search.
pub struct TrackMatcher {
    destination: Arc<dyn DestinationCatalog>,
    dispatcher: Arc<Dispatcher>,
    max_results: u32,
}

impl TrackMatcher {
    pub fn new(
        destination: Arc<dyn DestinationCatalog>,
        dispatcher: Arc<Dispatcher>,
        max_results: u32,
    ) -> Self {
        Self {
            destination,
            dispatcher,
            max_results,
        }
    }

    /// Searches with the primary query and, when that yields nothing or
    /// fails, once more with the relaxed query.
    ///
    /// A miss is not an error: the result simply has no destination item.
    /// Only fatal errors (credentials rejected, run cancelled) are returned.
    pub async fn match_track(&self, track: &Track) -> Result<MatchResult, MigrationError> {
        let primary = primary_query(track);
        match self.search(&primary).await {
            Ok(candidates) if !candidates.is_empty() => {
                return Ok(Self::resolve(track, &candidates, false));
            }
            Ok(_) => debug!(query = %primary, "matcher.primary.empty"),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(query = %primary, error = %e, "matcher.primary.failed"),
        }

        let relaxed = relaxed_query(track);
        let candidates = match self.search(&relaxed).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(query = %relaxed, error = %e, "matcher.fallback.failed");
                Vec::new()
            }
        };

        if candidates.is_empty() {
            debug!(query = %relaxed, "matcher.miss");
        }
        Ok(Self::resolve(track, &candidates, true))
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>, MigrationError> {
        debug!(query, max_results = self.max_results, "matcher.search");
        self.dispatcher
            .run(|| self.destination.search_videos(query, self.max_results))
            .await
    }

    fn resolve(track: &Track, candidates: &[Candidate], via_fallback: bool) -> MatchResult {
        let chosen = select_candidate(candidates);
        if let Some(candidate) = chosen {
            debug!(
                track = %track.key(),
                item = %candidate.item_id,
                channel = %candidate.channel_title,
                via_fallback,
                "matcher.selected"
            );
        }
        MatchResult {
            track: track.clone(),
            destination_item_id: chosen.map(|c| c.item_id.clone()),
            matched_via_fallback: via_fallback,
        }
    }
}
