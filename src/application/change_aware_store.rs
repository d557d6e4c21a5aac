//! Change-aware product store
//!
//! Writes a record only when it differs from the stored row, and reports
//! whether its image reference moved so derivative work can be skipped.

#![allow(clippy::uninlined_format_args)]

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::product::{ProductRecord, StoreAction};
use crate::domain::repositories::{ProductRepository, StoreError};

/// Largest absolute difference at which two prices are still equal
pub const PRICE_TOLERANCE: f64 = 0.01;

/// Absorbs binary float noise exactly at the tolerance boundary
const PRICE_SLACK: f64 = 1e-9;

pub struct ChangeAwareStore {
    repo: Arc<dyn ProductRepository>,
}

impl ChangeAwareStore {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    /// Persist `record` if it changed. Never fails; problems become [`StoreAction::Failed`].
    pub async fn upsert(&self, record: &ProductRecord) -> StoreAction {
        let Some(product_id) = record.id.as_deref() else {
            let err = StoreError::MissingIdentity {
                source_url: record.source_url.clone(),
            };
            warn!("⚠️ Refusing to store '{}': {}", record.name, err);
            return StoreAction::Failed;
        };

        let prior = match self.repo.find_by_id(product_id).await {
            Ok(prior) => prior,
            Err(e) => {
                error!("❌ Lookup failed for product {}: {}", product_id, e);
                return StoreAction::Failed;
            }
        };

        if let Some(existing) = &prior {
            if records_equal(existing, record) {
                debug!("Product {} unchanged, skipping", product_id);
                return StoreAction::Skipped;
            }
        }

        let now = Utc::now();
        let to_write = ProductRecord {
            created_at: Some(prior.as_ref().and_then(|p| p.created_at).unwrap_or(now)),
            updated_at: Some(now),
            ..record.clone()
        };

        if let Err(e) = self.repo.upsert(&to_write).await {
            error!("❌ Failed to store product {}: {}", product_id, e);
            return StoreAction::Failed;
        }

        match prior {
            None => {
                debug!("Inserted product {}", product_id);
                StoreAction::Inserted
            }
            Some(existing) => {
                let image_changed = existing.image_url != record.image_url;
                debug!("Updated product {} (image changed: {})", product_id, image_changed);
                StoreAction::Updated { image_changed }
            }
        }
    }
}

/// Change predicate over the persisted business fields.
///
/// Identity and timestamps are not compared.
pub fn records_equal(stored: &ProductRecord, incoming: &ProductRecord) -> bool {
    stored.name == incoming.name
        && stored.description == incoming.description
        && prices_equal(Some(stored.price), Some(incoming.price))
        && stored.image_url == incoming.image_url
        && prices_equal(stored.sale_price, incoming.sale_price)
        && stored.out_of_stock == incoming.out_of_stock
        && stored.categories_joined() == incoming.categories_joined()
        && stored.source_url == incoming.source_url
}

/// Empty and zero are the same value; anything else compares within [`PRICE_TOLERANCE`].
pub fn prices_equal(a: Option<f64>, b: Option<f64>) -> bool {
    let empty_or_zero = |v: Option<f64>| v.is_none_or(|v| v == 0.0);
    match (empty_or_zero(a), empty_or_zero(b)) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => {
            let (a, b) = (a.unwrap_or_default(), b.unwrap_or_default());
            (a - b).abs() <= PRICE_TOLERANCE + PRICE_SLACK
        }
    }
}
