// Database connection and pool management
// This module handles the SQLite product store using sqlx

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (and create if missing) the database file at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        // Single writer; the sync pipeline is sequential
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!("🗄️ Opened product database at {}", path.display());
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        // Create tables manually for now
        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS products (
                product_id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                price REAL,
                image_url TEXT,
                sale_price REAL,
                out_of_stock INTEGER,
                categories TEXT,
                source_url TEXT,
                created_at TEXT,
                updated_at TEXT
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_products_categories ON products (categories);
        "#;

        sqlx::query(create_products_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
