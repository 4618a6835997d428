//! Database connection and pool management
//!
//! SQLite connections via sqlx, with schema creation on startup.

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create database file and parent directory if missing
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        let in_memory = db_path == ":memory:";
        if !in_memory && !Path::new(db_path).exists() {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            std::fs::File::create(db_path)?;
        }

        // An in-memory database lives and dies with its connection, so the
        // pool must hold exactly one and never recycle it.
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        // The composite key (article_number, color_id) identifies a product;
        // NULL color_id rows are their own key value, which the batch engine
        // enforces in its Rust-side lookup (SQLite UNIQUE treats NULLs as
        // distinct).
        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_number TEXT NOT NULL,
                color_id TEXT,
                ean TEXT,
                name TEXT,
                description TEXT,
                material TEXT,
                category TEXT,
                price REAL,
                source_url TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
        "#;

        let create_images_sql = r#"
            CREATE TABLE IF NOT EXISTS product_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                url TEXT NOT NULL,
                data BLOB,
                position INTEGER NOT NULL,
                is_primary BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (product_id) REFERENCES products (id) ON DELETE CASCADE
            )
        "#;

        let create_key_index_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_products_article_number
            ON products (article_number)
        "#;

        sqlx::query(create_products_sql).execute(&self.pool).await?;
        sqlx::query(create_images_sql).execute(&self.pool).await?;
        sqlx::query(create_key_index_sql).execute(&self.pool).await?;

        Ok(())
    }
}
