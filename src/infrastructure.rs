//! Infrastructure layer for database connections, parsing, and external integrations
//!
//! This module provides the SQLite product store, HTML extraction, HTTP
//! fetching, image derivatives, configuration and logging.

pub mod config; // Configuration loading and defaults
pub mod database_connection;
pub mod http_client;
pub mod image_processor;
pub mod logging; // Logging infrastructure
pub mod page_fetcher;
pub mod parsing; // Listing card extraction
pub mod product_repository;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, ConfigManager, SyncConfig};
pub use database_connection::DatabaseConnection;
pub use http_client::{FetchError, FetchedBody, HttpClient, HttpFetch};
pub use image_processor::{Derivation, ImageDerivativeGenerator, ImageDownloader, ImageError, sanitize_filename};
pub use logging::init_logging;
pub use page_fetcher::PageFetcher;
pub use parsing::{ParsingError, ProductCardParser};
pub use product_repository::SqliteProductRepository;
