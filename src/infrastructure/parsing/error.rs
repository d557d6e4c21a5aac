//! Parsing error types for listing extraction
//!
//! Every variant drops exactly one record; none of them abort a page.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required structure '{selector}' not found: {detail}")]
    StructureMissing { selector: String, detail: String },

    #[error("Price text '{raw}' is not numeric after normalization")]
    InvalidPrice { raw: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed { url: String, reason: String },
}

impl ParsingError {
    pub fn structure_missing(selector: &str, detail: &str) -> Self {
        Self::StructureMissing {
            selector: selector.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn invalid_price(raw: &str) -> Self {
        Self::InvalidPrice { raw: raw.to_string() }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short failure reason for logs and counters
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidPrice { .. } => "price",
            Self::StructureMissing { .. } | Self::UrlResolutionFailed { .. } => "exception",
            Self::InvalidSelector { .. } => "configuration",
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
