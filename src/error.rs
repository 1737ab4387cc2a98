//! Error taxonomy for the migration pipeline.
//!
//! Errors fall into two groups. Fatal errors unwind the whole run (the source
//! catalog cannot be read, the destination rejects our credentials, the run was
//! cancelled, the ledger cannot be written). Per-track errors are caught at the
//! worker boundary, reported and counted, and never abort sibling work.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("destination rejected credentials: {0}")]
    DestinationAuthFailure(String),
    #[error("no match found for query: {0}")]
    NoMatchFound(String),
    #[error("insert failed: {0}")]
    InsertFailure(String),
    #[error("dispatch cancelled")]
    DispatchCancelled,
    #[error("destination error: {0}")]
    Destination(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("ledger error: {0}")]
    Ledger(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl MigrationError {
    /// Whether this error must abort the run instead of skipping one track.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrationError::SourceUnavailable(_)
                | MigrationError::DestinationAuthFailure(_)
                | MigrationError::DispatchCancelled
                | MigrationError::Config(_)
                | MigrationError::Auth(_)
                | MigrationError::Ledger(_)
        )
    }
}

impl From<reqwest::Error> for MigrationError {
    fn from(e: reqwest::Error) -> Self {
        MigrationError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(e: serde_json::Error) -> Self {
        MigrationError::Parse(e.to_string())
    }
}
