use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::{PlaylistSelection, PlaylistSummary, PlaylistTableRow};

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Opaque value echoed back by the authorization server to bind the callback
/// to the request we started.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Parses a playlist selection typed by the user.
///
/// Accepts `all`, `liked` (or the sentinel `0`) and 1-based indices separated
/// by whitespace or commas. Tokens that are not numbers are ignored, repeated
/// indices are kept once in first-seen order. Returns `None` when nothing
/// usable was entered, or when Liked Songs is mixed with playlist indices.
pub fn parse_selection(input: &str) -> Option<PlaylistSelection> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Some(PlaylistSelection::All);
    }
    if trimmed.eq_ignore_ascii_case("liked") || trimmed == "0" {
        return Some(PlaylistSelection::LikedSongs);
    }

    let mut indices: Vec<usize> = Vec::new();
    for token in trimmed.split(|c: char| c.is_whitespace() || c == ',') {
        if token.eq_ignore_ascii_case("liked") {
            return None;
        }
        match token.parse::<usize>() {
            Ok(0) => return None,
            Ok(index) if !indices.contains(&index) => indices.push(index),
            _ => {}
        }
    }

    if indices.is_empty() {
        None
    } else {
        Some(PlaylistSelection::Indices(indices))
    }
}

/// Table rows for the playlist picker; row `0` is always Liked Songs.
pub fn playlist_table_rows(playlists: &[PlaylistSummary]) -> Vec<PlaylistTableRow> {
    let mut rows = vec![PlaylistTableRow {
        index: 0,
        name: "Liked Songs".to_string(),
        tracks: "-".to_string(),
    }];
    rows.extend(
        playlists
            .iter()
            .enumerate()
            .map(|(i, p)| PlaylistTableRow {
                index: i + 1,
                name: p.name.clone(),
                tracks: p.track_count.to_string(),
            }),
    );
    rows
}

/// Title of the playlist created on the destination.
pub fn migrated_title(source_name: &str) -> String {
    format!("{source_name} (Migrated)")
}

/// Seconds from a `Retry-After` header, when it holds a plain number.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
