use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, warn};

use crate::{error::MigrationError, types::TrackKey};

struct LedgerState {
    keys: HashSet<TrackKey>,
    file: Option<File>,
    // The file ends in a torn record; the next append starts a fresh line.
    needs_newline: bool,
}

/// Append-only record of tracks already migrated.
///
/// Persisted as plain text, one `"<title> - <artist>\n"` line per key. Each
/// record is written and synced before [`MigrationLedger::record`] returns,
/// and physical writes are serialized, so concurrent workers can share one
/// ledger.
pub struct MigrationLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl MigrationLedger {
    /// Opens the ledger at `path`, loading every complete record. A missing
    /// file is an empty ledger.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, MigrationError> {
        let path = path.into();
        let (keys, needs_newline) = Self::read(&path).await?;
        debug!(path = %path.display(), keys = keys.len(), "ledger.open");

        Ok(Self {
            path,
            state: Mutex::new(LedgerState {
                keys,
                file: None,
                needs_newline,
            }),
        })
    }

    /// All keys recorded in the file at `path`.
    pub async fn load_all(path: &Path) -> Result<HashSet<TrackKey>, MigrationError> {
        Ok(Self::read(path).await?.0)
    }

    async fn read(path: &Path) -> Result<(HashSet<TrackKey>, bool), MigrationError> {
        let content = match async_fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((HashSet::new(), false)),
            Err(e) => return Err(MigrationError::Ledger(e)),
        };

        let mut lines: Vec<&str> = content.split('\n').collect();
        // Whatever follows the last newline never completed.
        let torn = lines.pop().unwrap_or_default();
        if !torn.is_empty() {
            warn!(path = %path.display(), fragment = torn, "ledger.torn_record");
        }

        let keys = lines
            .into_iter()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(|line| TrackKey::from(line.to_string()))
            .collect();

        Ok((keys, !torn.is_empty()))
    }

    pub async fn contains(&self, key: &TrackKey) -> bool {
        self.state.lock().await.keys.contains(key)
    }

    /// Durably appends `key`. Recording a key that is already present is a
    /// no-op.
    pub async fn record(&self, key: &TrackKey) -> Result<(), MigrationError> {
        let mut state = self.state.lock().await;
        if state.keys.contains(key) {
            return Ok(());
        }

        let mut line = String::with_capacity(key.as_str().len() + 2);
        if state.needs_newline {
            line.push('\n');
        }
        line.push_str(key.as_str());
        line.push('\n');

        if state.file.is_none() {
            state.file = Some(self.open_for_append().await?);
        }
        if let Some(file) = state.file.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            file.sync_data().await?;
        }

        state.needs_newline = false;
        state.keys.insert(key.clone());
        debug!(key = %key, "ledger.record");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_for_append(&self) -> Result<File, MigrationError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                async_fs::create_dir_all(parent).await?;
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(file)
    }
}
