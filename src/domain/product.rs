use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when categories are flattened into a single column.
pub const CATEGORY_SEPARATOR: char = ',';

/// Canonical product entity harvested from one listing card.
///
/// `id` is the only identity field: two records with the same `id` are the
/// same logical product across runs, whatever else drifted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// Last path segment of the detail link. `None` when the card had no link.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    /// Reserved, never populated by extraction.
    pub sale_price: Option<f64>,
    /// Reserved, always false from extraction.
    pub out_of_stock: bool,
    /// Ordered set in extraction order.
    pub categories: Vec<String>,
    pub source_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    /// Build the detail page URL: `{base_url}/{id}`, or `base_url` without identity.
    pub fn source_url_for(base_url: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}", base_url.trim_end_matches('/'), id),
            None => base_url.to_string(),
        }
    }

    /// Persisted form of the categories column.
    pub fn categories_joined(&self) -> String {
        join_categories(&self.categories)
    }

    /// Identity for log lines; degraded records show as `<none>`.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<none>")
    }
}

/// Flatten categories into the comma-joined column value.
pub fn join_categories(categories: &[String]) -> String {
    categories.join(&CATEGORY_SEPARATOR.to_string())
}

/// Inverse of [`join_categories`]: trims each label and drops empties.
pub fn split_categories(joined: &str) -> Vec<String> {
    joined
        .split(CATEGORY_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// One listing card as fetched from a catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub page: u32,
    pub index: usize,
}

impl Fragment {
    pub fn new(html: impl Into<String>, page: u32, index: usize) -> Self {
        Self { html: html.into(), page, index }
    }
}

/// Target canvas for a raster derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Outcome of a change-aware upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Inserted,
    Updated { image_changed: bool },
    /// Stored row is equal under the change predicate; nothing was written.
    Skipped,
    /// Persistence failed or was refused; treated like `Skipped` downstream.
    Failed,
}

impl StoreAction {
    /// Derivatives are produced for new products and for changed image references only.
    pub const fn needs_image_work(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated { image_changed: true })
    }
}
