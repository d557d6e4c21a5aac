//! Per-category product report
//!
//! Writes one CSV section per category found in the store, most expensive
//! products first.

#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use thiserror::Error;
use tracing::info;

use crate::domain::product::{ProductRecord, split_categories};
use crate::domain::repositories::{ProductRepository, StoreError};

const HEADERS: [&str; 9] = [
    "ID",
    "Name",
    "Description",
    "Price",
    "Image URL",
    "Sale Price",
    "Out of Stock",
    "Categories",
    "Source URL",
];

const TIMESTAMP_HEADERS: [&str; 2] = ["Created At", "Updated At"];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read products: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Every category label across all products, first-seen order, no repeats
pub async fn collect_categories(repo: &dyn ProductRepository) -> Result<Vec<String>, StoreError> {
    let mut categories: Vec<String> = Vec::new();
    for joined in repo.distinct_categories().await? {
        for category in split_categories(&joined) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
    }
    Ok(categories)
}

/// Write the report and return the number of category sections.
pub async fn write_category_report<W: Write>(
    repo: &dyn ProductRepository,
    out: &mut W,
    include_timestamps: bool,
) -> Result<usize, ReportError> {
    let categories = collect_categories(repo).await?;
    if categories.is_empty() {
        writeln!(out, "No categories found in the database.")?;
        return Ok(0);
    }

    for category in &categories {
        let products = repo.find_by_category_substring(category).await?;

        writeln!(out, "\n\nProducts in category: {}", category)?;
        writeln!(out, "{}", "-".repeat(50))?;

        let mut csv_writer = csv::Writer::from_writer(&mut *out);
        if include_timestamps {
            csv_writer.write_record(HEADERS.iter().chain(TIMESTAMP_HEADERS.iter()))?;
        } else {
            csv_writer.write_record(HEADERS)?;
        }
        for product in &products {
            csv_writer.write_record(report_row(product, include_timestamps))?;
        }
        csv_writer.flush()?;
        drop(csv_writer);

        if products.is_empty() {
            writeln!(out, "No products found in category: {}", category)?;
        }
    }

    info!("📊 Report written for {} categories", categories.len());
    Ok(categories.len())
}

fn report_row(product: &ProductRecord, include_timestamps: bool) -> Vec<String> {
    let mut row = vec![
        product.display_id().to_string(),
        product.name.clone(),
        product.description.clone(),
        format!("{:.2}", product.price),
        product.image_url.clone().unwrap_or_default(),
        product.sale_price.map(|p| format!("{:.2}", p)).unwrap_or_default(),
        u8::from(product.out_of_stock).to_string(),
        product.categories_joined(),
        product.source_url.clone(),
    ];
    if include_timestamps {
        for timestamp in [product.created_at, product.updated_at] {
            row.push(timestamp.map(|t| t.to_rfc3339()).unwrap_or_default());
        }
    }
    row
}
