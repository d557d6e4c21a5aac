//! Catalog Sync - Incremental product catalog harvester
//!
//! Walks a paginated product listing, keeps a local SQLite catalog in step
//! with it while writing only what changed, and renders fixed-size image
//! derivatives for new or re-imaged products.

#![allow(clippy::uninlined_format_args)]

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::application::{SyncOrchestrator, write_category_report};
use crate::domain::{ProductRepository, SyncSummary};
use crate::infrastructure::{AppConfig, DatabaseConnection, HttpClient, SqliteProductRepository};

/// Run the one-shot sync, then print the report to stdout.
///
/// Returns `None` without touching the network when the database already
/// exists.
pub async fn run_sync(config: &AppConfig) -> Result<Option<SyncSummary>> {
    let db_path = &config.sync.db_location;
    if db_path.exists() {
        info!(
            "Database already exists at {}; remove it to run a fresh sync",
            db_path.display()
        );
        return Ok(None);
    }

    // Reject bad configuration before the database file exists
    config.sync.validate().context("invalid sync configuration")?;
    let http = Arc::new(HttpClient::from_sync_config(&config.sync)?);

    let db = DatabaseConnection::open(db_path)
        .await
        .with_context(|| format!("opening database {}", db_path.display()))?;
    db.migrate().await.context("creating product schema")?;

    let repo: Arc<dyn ProductRepository> = Arc::new(SqliteProductRepository::new(db.pool().clone()));
    let orchestrator = SyncOrchestrator::new(config.sync.clone(), http, repo.clone())?;

    let summary = orchestrator.run().await;
    print_report(repo.as_ref(), config.report.include_timestamps).await?;

    db.close().await;
    Ok(Some(summary))
}

/// Print the category report for an existing database.
pub async fn run_report(config: &AppConfig) -> Result<()> {
    let db_path = &config.sync.db_location;
    if !db_path.exists() {
        bail!(
            "Database does not exist at {}. Run a sync first to create and populate it.",
            db_path.display()
        );
    }

    let db = DatabaseConnection::open(db_path).await?;
    let repo = SqliteProductRepository::new(db.pool().clone());
    print_report(&repo, config.report.include_timestamps).await?;

    db.close().await;
    Ok(())
}

async fn print_report(repo: &dyn ProductRepository, include_timestamps: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_category_report(repo, &mut out, include_timestamps).await?;
    out.flush()?;
    Ok(())
}
