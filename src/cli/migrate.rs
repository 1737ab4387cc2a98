use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::{
    cli::{ConsoleProgress, playlists::print_playlists},
    config::MigrationSettings,
    error,
    error::MigrationError,
    info,
    management::MigrationLedger,
    pipeline::{DestinationCatalog, Orchestrator, RunSummary},
    spotify::SpotifyClient,
    success,
    types::{Candidate, PlaylistHandle, PlaylistSelection, Privacy},
    utils, warning,
    youtube::YouTubeClient,
};

/// Command-line overrides for a migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub select: Option<String>,
    pub dry_run: bool,
    pub preserve_order: bool,
    pub limit: Option<usize>,
    pub ledger: Option<PathBuf>,
}

/// Stand-in destination for dry runs without a YouTube login. Dry runs never
/// call the destination, so every method just reports the missing login.
struct LoggedOutDestination;

#[async_trait]
impl DestinationCatalog for LoggedOutDestination {
    async fn search_videos(&self, _: &str, _: u32) -> Result<Vec<Candidate>, MigrationError> {
        Err(logged_out())
    }

    async fn create_playlist(
        &self,
        _: &str,
        _: &str,
        _: Privacy,
    ) -> Result<PlaylistHandle, MigrationError> {
        Err(logged_out())
    }

    async fn insert_playlist_item(&self, _: &str, _: &str) -> Result<(), MigrationError> {
        Err(logged_out())
    }
}

fn logged_out() -> MigrationError {
    MigrationError::DestinationAuthFailure("not logged in to YouTube".to_string())
}

fn settings_for(options: &MigrateOptions) -> Result<MigrationSettings, MigrationError> {
    let mut settings = MigrationSettings::from_env()?;
    settings.dry_run = options.dry_run;
    settings.preserve_order = options.preserve_order;
    if let Some(limit) = options.limit {
        settings.max_tracks = Some(limit);
    }
    if let Some(path) = &options.ledger {
        settings.ledger_path = path.clone();
    }
    settings.validate()?;
    Ok(settings)
}

async fn destination_for(
    settings: &MigrationSettings,
) -> Result<Arc<dyn DestinationCatalog>, MigrationError> {
    match YouTubeClient::connect().await {
        Ok(client) => Ok(Arc::new(client)),
        Err(e) if settings.dry_run => {
            warning!("No YouTube login ({}); continuing the dry run without it.", e);
            Ok(Arc::new(LoggedOutDestination))
        }
        Err(e) => Err(e),
    }
}

async fn prompt_selection() -> Option<PlaylistSelection> {
    info!("Select playlists to migrate (numbers separated by spaces, 'all', or 0 for Liked Songs):");
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    match stdin.read_line(&mut line).await {
        Ok(_) => utils::parse_selection(&line),
        Err(_) => None,
    }
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if dry_run {
        info!(
            "Dry run complete: {} ({} planned across {} playlist(s)). Nothing was written.",
            summary.tally(),
            summary.planned,
            summary.playlists
        );
        return;
    }

    success!("{}", summary.tally());
    if summary.fallback_matched > 0 {
        info!("{} matched by fallback search", summary.fallback_matched);
    }
    if summary.playlists_failed > 0 {
        warning!(
            "{} playlist(s) could not be created on YouTube",
            summary.playlists_failed
        );
    }
}

pub async fn migrate(options: MigrateOptions) {
    let settings = match settings_for(&options) {
        Ok(settings) => settings,
        Err(e) => error!("Invalid settings: {}", e),
    };

    let source = match SpotifyClient::connect().await {
        Ok(client) => Arc::new(client),
        Err(e) => error!("{}", e),
    };
    let destination = match destination_for(&settings).await {
        Ok(destination) => destination,
        Err(e) => error!("{}", e),
    };
    let ledger = match MigrationLedger::open(settings.ledger_path.clone()).await {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => error!(
            "Failed to open ledger {}: {}",
            settings.ledger_path.display(),
            e
        ),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warning!("Interrupted, stopping after in-flight requests...");
            on_signal.cancel();
        }
    });

    let dry_run = settings.dry_run;
    let orchestrator = Orchestrator::new(source, destination, ledger, settings, cancel)
        .with_observer(Arc::new(ConsoleProgress::new()));

    let result = match options.select.as_deref() {
        Some(raw) => match utils::parse_selection(raw) {
            Some(selection) => orchestrator.run(&selection).await,
            None => error!("Invalid selection: {}", raw),
        },
        None => {
            let catalog = match orchestrator.fetch_catalog().await {
                Ok(catalog) => catalog,
                Err(e) => error!("Failed to fetch playlists: {}", e),
            };
            print_playlists(&catalog);
            match prompt_selection().await {
                Some(selection) => orchestrator.run_selected(&catalog, &selection).await,
                None => error!("Invalid selection"),
            }
        }
    };

    match result {
        Ok(summary) => print_summary(&summary, dry_run),
        Err(e) => {
            print_summary(&orchestrator.summary(), dry_run);
            error!("Migration aborted: {}", e);
        }
    }
}
