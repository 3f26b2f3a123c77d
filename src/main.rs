//! # kobo-notion CLI
//!
//! Copies the highlights and notes on a Kobo e-reader into a Notion
//! database, keeping one page per book up to date across runs.
//!
//! ## Usage
//!
//! ```bash
//! kobo-notion --config ./config/kobo-notion.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kobo-notion sync` | Create, extend, prune, and archive Notion pages |
//! | `kobo-notion sync --dry-run` | Show the writes a sync would make |
//! | `kobo-notion status` | Count local records and remote pages |
//!
//! ## Examples
//!
//! ```bash
//! # Sync with the token taken from the environment
//! NOTION_TOKEN=secret_... kobo-notion sync
//!
//! # Machine-readable report
//! kobo-notion sync --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kobo_notion::{config, logging, status, sync};

/// Sync Kobo highlights and notes into Notion.
///
/// Settings are read from a TOML file and may be overridden with the
/// `NOTION_TOKEN`, `NOTION_DATABASE_ID`, `KOBO_DB_PATH`, and `CERT_PATH`
/// environment variables. See `config/kobo-notion.example.toml`.
#[derive(Parser)]
#[command(
    name = "kobo-notion",
    about = "Sync Kobo e-reader highlights and notes into a Notion database",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file is allowed when
    /// the environment supplies the required settings.
    #[arg(long, global = true, default_value = "./config/kobo-notion.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the Notion database with the Kobo bookmarks.
    ///
    /// Books without a page get one; existing pages gain new highlights
    /// and lose deleted ones; pages for books with no bookmarks left are
    /// archived.
    Sync {
        /// Read from Notion but only print the writes that would be made.
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show local and remote counts without writing anything.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    let _guard = logging::init(&cfg.log)?;

    match cli.command {
        Commands::Sync { dry_run, json } => {
            let report = sync::run_sync(&cfg, dry_run, json).await?;
            if !report.errors.is_empty() {
                tracing::warn!(failures = report.errors.len(), "sync finished with errors");
            }
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}
