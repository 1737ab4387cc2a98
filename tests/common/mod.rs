#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use plexport::{
    error::MigrationError,
    pipeline::{DestinationCatalog, SourceCatalog},
    types::{Candidate, Page, PlaylistHandle, PlaylistSummary, Privacy, Track},
};

pub fn track(title: &str, artist: &str) -> Track {
    Track::new(title, artist, format!("src-{title}"))
}

pub fn candidate(item_id: &str, channel: &str) -> Candidate {
    Candidate {
        item_id: item_id.to_string(),
        title: item_id.to_string(),
        channel_title: channel.to_string(),
    }
}

pub fn playlist(id: &str, name: &str, track_count: u32) -> PlaylistSummary {
    PlaylistSummary {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        track_count,
    }
}

/// In-memory source library that serves slices of fixed track lists.
#[derive(Default)]
pub struct StubSource {
    pub playlists: Vec<PlaylistSummary>,
    pub tracks: HashMap<String, Vec<Track>>,
    pub liked: Vec<Track>,
    /// Page requests fail once the offset reaches this value.
    pub fail_at_offset: Option<u32>,
    pub unavailable: bool,
    pub page_requests: Mutex<Vec<(String, u32, u32)>>,
}

impl StubSource {
    pub fn with_playlist(mut self, summary: PlaylistSummary, tracks: Vec<Track>) -> Self {
        self.tracks.insert(summary.id.clone(), tracks);
        self.playlists.push(summary);
        self
    }

    pub fn with_liked(mut self, tracks: Vec<Track>) -> Self {
        self.liked = tracks;
        self
    }

    pub fn requests(&self) -> Vec<(String, u32, u32)> {
        self.page_requests.lock().unwrap().clone()
    }

    fn page(&self, id: &str, all: &[Track], offset: u32, limit: u32) -> Result<Page<Track>, MigrationError> {
        self.page_requests
            .lock()
            .unwrap()
            .push((id.to_string(), offset, limit));
        if self.unavailable || self.fail_at_offset.is_some_and(|at| offset >= at) {
            return Err(MigrationError::SourceUnavailable("stub outage".to_string()));
        }
        let start = (offset as usize).min(all.len());
        let end = (start + limit as usize).min(all.len());
        Ok(Page::new(all[start..end].to_vec()))
    }
}

#[async_trait]
impl SourceCatalog for StubSource {
    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, MigrationError> {
        if self.unavailable {
            return Err(MigrationError::SourceUnavailable("stub outage".to_string()));
        }
        Ok(self.playlists.clone())
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, MigrationError> {
        let all = self.tracks.get(playlist_id).cloned().unwrap_or_default();
        self.page(playlist_id, &all, offset, limit)
    }

    async fn list_saved_tracks(&self, offset: u32, limit: u32) -> Result<Page<Track>, MigrationError> {
        self.page("liked", &self.liked, offset, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Transient,
    Auth,
}

impl Failure {
    fn error(self, what: &str) -> MigrationError {
        match self {
            Failure::Transient => MigrationError::Destination(format!("{what}: 500")),
            Failure::Auth => MigrationError::DestinationAuthFailure(format!("{what}: 401")),
        }
    }
}

/// Destination that answers searches from a table and records every call.
#[derive(Default)]
pub struct StubDestination {
    pub results: HashMap<String, Vec<Candidate>>,
    pub search_failures: HashMap<String, Failure>,
    pub insert_failures: HashMap<String, Failure>,
    pub create_failure: Option<Failure>,
    /// Every call takes this long, to keep calls overlapping.
    pub latency: Option<Duration>,

    pub searches: Mutex<Vec<String>>,
    pub created: Mutex<Vec<(String, String, Privacy)>>,
    pub inserted: Mutex<Vec<(String, String)>>,
    pub call_starts: Mutex<Vec<tokio::time::Instant>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StubDestination {
    pub fn answer(mut self, query: &str, candidates: Vec<Candidate>) -> Self {
        self.results.insert(query.to_string(), candidates);
        self
    }

    /// Every track of `tracks` has a topic-channel hit for its primary query.
    pub fn answering_all(mut self, tracks: &[Track]) -> Self {
        for (i, t) in tracks.iter().enumerate() {
            self.results.insert(
                format!("{} {} topic", t.title, t.primary_artist),
                vec![candidate(
                    &format!("vid-{i}"),
                    &format!("{} - Topic", t.primary_artist),
                )],
            );
        }
        self
    }

    pub fn total_calls(&self) -> usize {
        self.searches.lock().unwrap().len()
            + self.created.lock().unwrap().len()
            + self.inserted.lock().unwrap().len()
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn inserted(&self) -> Vec<(String, String)> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, String, Privacy)> {
        self.created.lock().unwrap().clone()
    }

    async fn enter(&self) {
        self.call_starts
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DestinationCatalog for StubDestination {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<Candidate>, MigrationError> {
        self.enter().await;
        self.searches.lock().unwrap().push(query.to_string());
        let result = match self.search_failures.get(query) {
            Some(failure) => Err(failure.error("search")),
            None => {
                let mut hits = self.results.get(query).cloned().unwrap_or_default();
                hits.truncate(max_results as usize);
                Ok(hits)
            }
        };
        self.leave();
        result
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<PlaylistHandle, MigrationError> {
        self.enter().await;
        let result = match self.create_failure {
            Some(failure) => Err(failure.error("create")),
            None => {
                let mut created = self.created.lock().unwrap();
                created.push((title.to_string(), description.to_string(), privacy));
                Ok(PlaylistHandle {
                    destination_playlist_id: format!("pl-{}", created.len()),
                })
            }
        };
        self.leave();
        result
    }

    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        item_id: &str,
    ) -> Result<(), MigrationError> {
        self.enter().await;
        let result = match self.insert_failures.get(item_id) {
            Some(failure) => Err(failure.error("insert")),
            None => {
                self.inserted
                    .lock()
                    .unwrap()
                    .push((playlist_id.to_string(), item_id.to_string()));
                Ok(())
            }
        };
        self.leave();
        result
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
