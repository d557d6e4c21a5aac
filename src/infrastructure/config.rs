//! Configuration infrastructure
//!
//! Contains configuration loading and validation for catalog synchronization.
//!
//! Configuration is layered, lowest priority first:
//! 1. Built-in defaults (see [`defaults`])
//! 2. Optional TOML file
//! 3. `CATALOG_SYNC__<SECTION>__<KEY>` environment variables

#![allow(clippy::uninlined_format_args)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::domain::product::ImageSize;
use crate::infrastructure::parsing::compile_selector;
use crate::infrastructure::parsing::config::ExtractionSelectors;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
    pub report: ReportConfig,
}

/// Everything the sync orchestrator needs, passed in at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Listing endpoint; pages are requested as `{base_url}?page={n}`
    pub base_url: String,

    /// Origin used to absolutize relative image references.
    /// Derived from `base_url` when unset.
    pub site_origin: Option<String>,

    /// SQLite database file
    pub db_location: PathBuf,

    /// Where downloaded source images are kept
    pub raw_image_dir: PathBuf,

    /// Where derivatives are written
    pub processed_image_dir: PathBuf,

    pub image_sizes: Vec<ImageSize>,

    /// Headers sent with every request (user agent and friends)
    pub request_headers: HashMap<String, String>,

    /// Politeness delay between page fetches in milliseconds
    pub inter_page_delay_ms: u64,

    pub request_timeout_seconds: u64,

    /// Attempts made by the HTTP client for retryable statuses; 1 disables retries
    pub max_retries: u32,

    /// JPEG quality for raster derivatives (1-100)
    pub jpeg_quality: u8,

    pub selectors: ExtractionSelectors,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output (stderr; stdout carries the report)
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    pub log_dir: PathBuf,

    pub log_file_name: String,
}

/// Report output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Append `Created At` / `Updated At` columns
    pub include_timestamps: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            site_origin: None,
            db_location: PathBuf::from(defaults::DB_NAME),
            raw_image_dir: PathBuf::from(defaults::RAW_IMAGES_FOLDER),
            processed_image_dir: PathBuf::from(defaults::PROCESSED_IMAGES_FOLDER),
            image_sizes: defaults::IMAGE_SIZES
                .iter()
                .map(|&(w, h)| ImageSize::new(w, h))
                .collect(),
            request_headers: HashMap::from([(
                "User-Agent".to_string(),
                defaults::USER_AGENT.to_string(),
            )]),
            inter_page_delay_ms: defaults::REQUEST_DELAY_MS,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            jpeg_quality: defaults::JPEG_QUALITY,
            selectors: ExtractionSelectors::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            log_file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_timestamps: defaults::REPORT_INCLUDE_TIMESTAMPS,
        }
    }
}

impl SyncConfig {
    pub const fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    /// `site_origin` if configured, else scheme + host (+ port) of `base_url`.
    pub fn resolved_site_origin(&self) -> Result<Url, ConfigError> {
        let raw = self.site_origin.as_deref().unwrap_or(&self.base_url);
        let url = Url::parse(raw).map_err(|e| ConfigError::Validation {
            message: format!("invalid site origin '{}': {}", raw, e),
        })?;
        let origin = url.origin().ascii_serialization();
        Url::parse(&origin).map_err(|e| ConfigError::Validation {
            message: format!("'{}' has no usable origin: {}", raw, e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::Validation {
            message: format!("base_url '{}' is not a valid URL: {}", self.base_url, e),
        })?;
        self.resolved_site_origin()?;

        if self.image_sizes.is_empty() {
            return Err(ConfigError::Validation {
                message: "image_sizes must contain at least one size".to_string(),
            });
        }
        if let Some(size) = self.image_sizes.iter().find(|s| s.width == 0 || s.height == 0) {
            return Err(ConfigError::Validation {
                message: format!("image size {} has a zero dimension", size),
            });
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Validation {
                message: format!("jpeg_quality must be within 1..=100, got {}", self.jpeg_quality),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Validation {
                message: "max_retries must be at least 1".to_string(),
            });
        }

        for (name, value) in &self.request_headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::Validation {
                message: format!("invalid header name '{}': {}", name, e),
            })?;
            HeaderValue::from_str(value).map_err(|e| ConfigError::Validation {
                message: format!("invalid value for header '{}': {}", name, e),
            })?;
        }

        for selector in self.selectors.all() {
            compile_selector(selector).map_err(|e| ConfigError::Validation {
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()
    }
}

/// Loads [`AppConfig`] from defaults, an optional file and the environment.
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Environment variable prefix, e.g. `CATALOG_SYNC__SYNC__BASE_URL`
    pub const ENV_PREFIX: &'static str = "CATALOG_SYNC";

    /// Use an explicit file, or search the default locations when `None`.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.or_else(Self::discover_config_file);
        Self { config_path }
    }

    /// `./catalog-sync.toml`, then `{config_dir}/catalog-sync/config.toml`
    fn discover_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("catalog-sync").join("config.toml"))
            .filter(|path| path.exists())
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = &self.config_path {
            info!("Loading configuration from: {:?}", path);
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        } else {
            debug!("No configuration file found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// Default configuration values
pub mod defaults {
    /// Default listing endpoint
    pub const BASE_URL: &str = "https://sandbox.oxylabs.io/products";

    /// Default SQLite database file
    pub const DB_NAME: &str = "products.db";

    /// Default folder for downloaded source images
    pub const RAW_IMAGES_FOLDER: &str = "product_raw_images";

    /// Default folder for derivatives
    pub const PROCESSED_IMAGES_FOLDER: &str = "product_images";

    /// Default derivative canvases
    pub const IMAGE_SIZES: &[(u32, u32)] = &[(100, 100), (500, 500), (2000, 2000)];

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    /// Default delay between page fetches in milliseconds
    pub const REQUEST_DELAY_MS: u64 = 1000;

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default attempts per request for retryable statuses
    pub const MAX_RETRIES: u32 = 3;

    pub const JPEG_QUALITY: u8 = 85;

    // Log configuration defaults
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE_NAME: &str = "catalog-sync.log";

    pub const REPORT_INCLUDE_TIMESTAMPS: bool = false;

    /// Config file looked up in the working directory
    pub const LOCAL_CONFIG_FILE: &str = "catalog-sync.toml";
}
