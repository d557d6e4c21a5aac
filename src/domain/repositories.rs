//! Repository interfaces for the product catalog
//!
//! Contains the trait the change-aware store persists through. The SQLite
//! implementation lives in the infrastructure layer.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::ProductRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record has no identity and cannot be keyed: {source_url}")]
    MissingIdentity { source_url: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Point lookup by primary key.
    async fn find_by_id(&self, product_id: &str) -> StoreResult<Option<ProductRecord>>;

    /// Insert-or-replace keyed by `product_id`, in a single transaction.
    /// Timestamps are written as given on the record.
    async fn upsert(&self, product: &ProductRecord) -> StoreResult<()>;

    /// Every distinct raw `categories` column value.
    async fn distinct_categories(&self) -> StoreResult<Vec<String>>;

    /// Products whose categories column contains `category`, ordered by
    /// price descending then name ascending.
    async fn find_by_category_substring(&self, category: &str) -> StoreResult<Vec<ProductRecord>>;

    async fn count(&self) -> StoreResult<u64>;
}
