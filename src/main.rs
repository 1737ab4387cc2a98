use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use plexport::{cli, config, error, logging, types::Provider};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Print diagnostic logs to stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in to Spotify or YouTube
    Auth(AuthOptions),

    /// List the playlists that can be migrated
    Playlists,

    /// Migrate playlists or liked songs to YouTube
    Migrate(MigrateOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ProviderArg {
    Spotify,
    Youtube,
}

impl From<ProviderArg> for Provider {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Spotify => Provider::Spotify,
            ProviderArg::Youtube => Provider::YouTube,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    #[clap(value_enum)]
    provider: ProviderArg,
}

#[derive(Parser, Debug, Clone)]
pub struct MigrateOptions {
    /// Playlists to migrate: `all`, `liked` (or 0), or indices like "1 3,4"
    #[clap(long)]
    select: Option<String>,

    /// Search nothing and write nothing; only report what would happen
    #[clap(long)]
    dry_run: bool,

    /// Insert tracks one by one in source order
    #[clap(long)]
    preserve_order: bool,

    /// Migrate at most this many tracks per playlist
    #[clap(long)]
    limit: Option<usize>,

    /// Path of the ledger of migrated tracks
    #[clap(long)]
    ledger: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Auth(opt) => cli::auth(opt.provider.into()).await,
        Command::Playlists => cli::list_playlists().await,
        Command::Migrate(opt) => {
            cli::migrate(cli::MigrateOptions {
                select: opt.select,
                dry_run: opt.dry_run,
                preserve_order: opt.preserve_order,
                limit: opt.limit,
                ledger: opt.ledger,
            })
            .await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
