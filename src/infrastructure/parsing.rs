//! HTML parsing infrastructure for catalog listings
//!
//! This module turns one listing card into a normalized [`ProductRecord`]
//! and tolerates missing markup field by field.
//!
//! [`ProductRecord`]: crate::domain::ProductRecord

pub mod config;
pub mod error;
pub mod price;
pub mod product_card_parser;

// Re-export public types
pub use config::ExtractionSelectors;
pub use error::{ParsingError, ParsingResult};
pub use price::normalize_price;
pub use product_card_parser::ProductCardParser;

use scraper::Selector;

/// Compile a configured selector string
pub(crate) fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, &e.to_string()))
}
