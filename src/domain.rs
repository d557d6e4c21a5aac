//! Domain module - Core catalog entities and repository seams
//!
//! This module contains the product entity, the value objects that flow
//! through the sync pipeline, and the repository trait the store is built on.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod product;
pub mod repositories;
pub mod sync_summary;

// Re-export commonly used items for convenience
pub use product::{Fragment, ImageSize, ProductRecord, StoreAction};
pub use repositories::ProductRepository;
pub use sync_summary::SyncSummary;
