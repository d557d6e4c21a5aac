//! SQLite implementation of the product repository
//!
//! One `products` table keyed by `product_id`. Categories are stored as the
//! comma-joined column value and split again on read.

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::product::{ProductRecord, split_categories};
use crate::domain::repositories::{ProductRepository, StoreError, StoreResult};

const SELECT_COLUMNS: &str = "product_id, name, description, price, image_url, sale_price, \
                              out_of_stock, categories, source_url, created_at, updated_at";

/// Repository over the `products` table
#[derive(Clone)]
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn find_by_id(&self, product_id: &str) -> StoreResult<Option<ProductRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM products WHERE product_id = ?", SELECT_COLUMNS))
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn upsert(&self, product: &ProductRecord) -> StoreResult<()> {
        let product_id = product.id.as_deref().ok_or_else(|| StoreError::MissingIdentity {
            source_url: product.source_url.clone(),
        })?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO products
            (product_id, name, description, price, image_url, sale_price, out_of_stock,
             categories, source_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                image_url = excluded.image_url,
                sale_price = excluded.sale_price,
                out_of_stock = excluded.out_of_stock,
                categories = excluded.categories,
                source_url = excluded.source_url,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(product.sale_price)
        .bind(product.out_of_stock)
        .bind(product.categories_joined())
        .bind(&product.source_url)
        .bind(product.created_at.unwrap_or(now))
        .bind(product.updated_at.unwrap_or(now))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("Upserted product {}", product_id);
        Ok(())
    }

    async fn distinct_categories(&self) -> StoreResult<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT categories FROM products WHERE categories IS NOT NULL AND categories != ''")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("categories")).collect())
    }

    async fn find_by_category_substring(&self, category: &str) -> StoreResult<Vec<ProductRecord>> {
        let pattern = format!("%{}%", escape_like(category));
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE categories LIKE ? ESCAPE '\\' ORDER BY price DESC, name ASC",
            SELECT_COLUMNS
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// Escape `LIKE` wildcards so category text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn product_from_row(row: &SqliteRow) -> StoreResult<ProductRecord> {
    let categories: Option<String> = row.try_get("categories")?;
    let out_of_stock: Option<i64> = row.try_get("out_of_stock")?;
    let price: Option<f64> = row.try_get("price")?;
    let description: Option<String> = row.try_get("description")?;
    let source_url: Option<String> = row.try_get("source_url")?;
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at")?;
    let updated_at: Option<DateTime<Utc>> = row.try_get("updated_at")?;

    Ok(ProductRecord {
        id: Some(row.try_get("product_id")?),
        name: row.try_get("name")?,
        description: description.unwrap_or_default(),
        price: price.unwrap_or_default(),
        image_url: row.try_get("image_url")?,
        sale_price: row.try_get("sale_price")?,
        out_of_stock: out_of_stock.is_some_and(|v| v != 0),
        categories: categories.as_deref().map(split_categories).unwrap_or_default(),
        source_url: source_url.unwrap_or_default(),
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use tempfile::TempDir;

    async fn repository() -> (TempDir, SqliteProductRepository) {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseConnection::open(&dir.path().join("products.db")).await.unwrap();
        db.migrate().await.unwrap();
        (dir, SqliteProductRepository::new(db.pool().clone()))
    }

    fn product(id: &str, name: &str, price: f64, categories: &[&str]) -> ProductRecord {
        ProductRecord {
            id: Some(id.to_string()),
            name: name.to_string(),
            description: format!("{} description", name),
            price,
            image_url: Some(format!("https://example.com/{}.jpg", id)),
            sale_price: None,
            out_of_stock: false,
            categories: categories.iter().map(ToString::to_string).collect(),
            source_url: format!("https://example.com/products/{}", id),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_find() {
        let (_dir, repo) = repository().await;
        repo.upsert(&product("1", "Alpha", 10.5, &["Action", "Adventure"])).await.unwrap();

        let stored = repo.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Alpha");
        assert_eq!(stored.categories, vec!["Action".to_string(), "Adventure".to_string()]);
        assert!(stored.created_at.is_some());
        assert!(stored.updated_at.is_some());
        assert!(repo.find_by_id("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let (_dir, repo) = repository().await;
        repo.upsert(&product("1", "Alpha", 10.0, &["Action"])).await.unwrap();
        repo.upsert(&product("1", "Alpha v2", 12.0, &["Action"])).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Alpha v2");
        assert!((stored.price - 12.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_upsert_refuses_record_without_identity() {
        let (_dir, repo) = repository().await;
        let mut record = product("x", "Nameless", 1.0, &[]);
        record.id = None;

        let err = repo.upsert(&record).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingIdentity { .. }));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_category_query_orders_by_price_then_name() {
        let (_dir, repo) = repository().await;
        repo.upsert(&product("1", "Beta", 5.0, &["Action"])).await.unwrap();
        repo.upsert(&product("2", "Alpha", 5.0, &["Action", "Puzzle"])).await.unwrap();
        repo.upsert(&product("3", "Gamma", 50.0, &["Puzzle", "Action"])).await.unwrap();
        repo.upsert(&product("4", "Delta", 99.0, &["Racing"])).await.unwrap();

        let names: Vec<String> = repo
            .find_by_category_substring("Action")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_category_query_treats_wildcards_literally() {
        let (_dir, repo) = repository().await;
        repo.upsert(&product("1", "Percent", 1.0, &["100% Fun"])).await.unwrap();
        repo.upsert(&product("2", "Plain", 1.0, &["100 Fun"])).await.unwrap();

        let found = repo.find_by_category_substring("100%").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Percent");
    }

    #[tokio::test]
    async fn test_distinct_categories_returns_raw_column_values() {
        let (_dir, repo) = repository().await;
        repo.upsert(&product("1", "A", 1.0, &["Action", "Puzzle"])).await.unwrap();
        repo.upsert(&product("2", "B", 1.0, &["Action", "Puzzle"])).await.unwrap();
        repo.upsert(&product("3", "C", 1.0, &["Racing"])).await.unwrap();

        let mut values = repo.distinct_categories().await.unwrap();
        values.sort();
        assert_eq!(values, vec!["Action,Puzzle".to_string(), "Racing".to_string()]);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b%c\\d"), "a\\_b\\%c\\\\d");
        assert_eq!(escape_like("Action"), "Action");
    }
}
