#![allow(missing_docs)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use catalog_sync_lib::infrastructure::{ConfigManager, init_logging};
use catalog_sync_lib::{run_report, run_sync};

#[derive(Parser, Debug)]
#[command(name = "catalog-sync", version, about = "Incremental product catalog sync")]
struct Cli {
    /// Configuration file (TOML); defaults to ./catalog-sync.toml when present
    #[arg(short, long, env = "CATALOG_SYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Harvest the catalog into a fresh database, then print the report
    #[default]
    Sync,
    /// Print the per-category report from an existing database
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::new(cli.config);
    let config = manager.load()?;
    init_logging(&config.logging)?;

    if let Some(path) = manager.config_path() {
        info!("Using configuration file {}", path.display());
    }

    match cli.command.unwrap_or_default() {
        Command::Sync => {
            if let Some(summary) = run_sync(&config).await? {
                info!("🎉 Sync complete: {}", summary);
            }
        }
        Command::Report => run_report(&config).await?,
    }

    Ok(())
}
