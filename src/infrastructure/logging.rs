//! Logging system configuration and initialization
//!
//! This module provides the logging setup with:
//! - Console output on stderr (stdout carries the report)
//! - Optional file output through a non-blocking writer
//! - Optional structured JSON logging
//! - Dependency noise suppressed unless tracing at `trace`

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

/// Dependency targets that are capped unless the configured level is `trace`
const QUIET_TARGETS: &[(&str, &str)] = &[
    ("sqlx::query", "warn"),
    ("sqlx::sqlite", "warn"),
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
];

/// Local wall-clock timestamps
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the filter: `RUST_LOG` wins, else the configured level with
/// dependency targets capped.
fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(level);
        if !level.to_lowercase().contains("trace") {
            for (target, cap) in QUIET_TARGETS {
                if let Ok(directive) = format!("{}={}", target, cap).parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
        if let Ok(directive) = format!("catalog_sync_lib={}", level).parse() {
            filter = filter.add_directive(directive);
        }
        filter
    })
}

/// Move an existing log file aside with its modification timestamp
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let modified = std::fs::metadata(&log_file_path)
        .and_then(|m| m.modified())
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let modified: chrono::DateTime<Local> = modified.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, modified.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            timestamped_path.display(),
            e
        )
    })?;
    Ok(())
}

fn file_layer(config: &LoggingConfig) -> Result<BoxedLayer> {
    std::fs::create_dir_all(&config.log_dir)
        .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e))?;
    rotate_existing_log_file(&config.log_dir, &config.log_file_name)?;

    let file_appender = rolling::never(&config.log_dir, &config.log_file_name);
    let (file_writer, file_guard) = non_blocking(file_appender);

    // Store the guard globally to prevent it from being dropped
    LOG_GUARDS
        .lock()
        .map_err(|_| anyhow!("log guard registry poisoned"))?
        .push(file_guard);

    let layer = if config.json_format {
        fmt::Layer::new()
            .json()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
            .with_ansi(false)
            .boxed()
    };
    Ok(layer)
}

fn console_layer(config: &LoggingConfig) -> BoxedLayer {
    if config.json_format {
        fmt::Layer::new()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimeFormatter)
            .boxed()
    } else {
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
            .boxed()
    }
}

/// Initialize logging with the given configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.file_output {
        layers.push(file_layer(config)?);
    }
    if config.console_output {
        layers.push(console_layer(config));
    }

    Registry::default()
        .with(layers)
        .with(build_env_filter(&config.level))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "📝 Logging initialized (level: {}, console: {}, file: {})",
        config.level, config.console_output, config.file_output
    );
    Ok(())
}
