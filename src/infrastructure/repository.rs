//! Repository for products and their image assets
//!
//! Raw sqlx queries over the products/product_images tables. The batch
//! upsert runs the whole flush in one transaction: update-or-insert per
//! record with full field and image-set replacement, never incremental
//! patching.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::domain::product::{ImageAsset, PersistedProduct, ProductRecord};
use crate::infrastructure::batch::FlushStats;

/// Key identifying one stored product. An absent color is its own key
/// value, not a wildcard.
pub type ProductKey = (String, Option<String>);

#[derive(Clone)]
pub struct ProductRepository {
    pool: Arc<SqlitePool>,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Ids of all persisted products whose article number is in the given
    /// set, keyed by the full `(article_number, color_id)` pair.
    pub async fn find_ids_by_article_numbers(
        &self,
        article_numbers: &[String],
    ) -> Result<HashMap<ProductKey, i64>> {
        if article_numbers.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; article_numbers.len()].join(", ");
        let query = format!(
            "SELECT id, article_number, color_id FROM products WHERE article_number IN ({placeholders})"
        );

        let mut query_builder = sqlx::query(&query);
        for article_number in article_numbers {
            query_builder = query_builder.bind(article_number);
        }
        let rows = query_builder.fetch_all(&*self.pool).await?;

        let mut lookup = HashMap::with_capacity(rows.len());
        for row in rows {
            let key = (row.get::<String, _>("article_number"), row.get("color_id"));
            lookup.insert(key, row.get::<i64, _>("id"));
        }
        Ok(lookup)
    }

    /// Upsert a batch of finished records in one transaction. Existing keys
    /// get all scalar fields overwritten and the image-asset set fully
    /// replaced; absent keys become new products.
    pub async fn upsert_batch(
        &self,
        records: &[ProductRecord],
        existing: &HashMap<ProductKey, i64>,
    ) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        // Ids inserted earlier in this batch must classify a repeat sighting
        // of the same key as an update, not a second insert.
        let mut known = existing.clone();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let key = (record.article_number.clone(), record.color_id.clone());
            match known.get(&key) {
                Some(&id) => {
                    self.update_product(&mut tx, id, record).await?;
                    stats.updated += 1;
                }
                None => {
                    let id = self.insert_product(&mut tx, record).await?;
                    known.insert(key, id);
                    stats.inserted += 1;
                }
            }
            stats.images += record.image_urls.len() as u32;
        }

        tx.commit().await?;
        debug!(
            "Committed batch: {} inserted, {} updated, {} images",
            stats.inserted, stats.updated, stats.images
        );
        Ok(stats)
    }

    async fn insert_product(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: &ProductRecord,
    ) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products
            (article_number, color_id, ean, name, description, material, category, price, source_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.article_number)
        .bind(&record.color_id)
        .bind(&record.ean)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.material)
        .bind(&record.category)
        .bind(record.price)
        .bind(&record.source_url)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let id = result.last_insert_rowid();
        self.insert_images(tx, id, &record.image_urls).await?;
        Ok(id)
    }

    async fn update_product(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
        record: &ProductRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET ean = ?, name = ?, description = ?, material = ?, category = ?,
                price = ?, source_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.ean)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.material)
        .bind(&record.category)
        .bind(record.price)
        .bind(&record.source_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut **tx)
        .await?;

        // Full image-set replacement with fresh order/primary flags
        sqlx::query("DELETE FROM product_images WHERE product_id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        self.insert_images(tx, id, &record.image_urls).await
    }

    async fn insert_images(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        product_id: i64,
        image_urls: &[String],
    ) -> Result<()> {
        for (position, url) in image_urls.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_images (product_id, url, position, is_primary)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(product_id)
            .bind(url)
            .bind(position as i32)
            .bind(position == 0)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Full persisted product with images, for the given key.
    pub async fn get_by_key(
        &self,
        article_number: &str,
        color_id: Option<&str>,
    ) -> Result<Option<PersistedProduct>> {
        let row = match color_id {
            Some(color) => {
                sqlx::query(
                    r#"
                    SELECT id, article_number, color_id, ean, name, description, material,
                           category, price, source_url, created_at, updated_at
                    FROM products WHERE article_number = ? AND color_id = ?
                    "#,
                )
                .bind(article_number)
                .bind(color)
                .fetch_optional(&*self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, article_number, color_id, ean, name, description, material,
                           category, price, source_url, created_at, updated_at
                    FROM products WHERE article_number = ? AND color_id IS NULL
                    "#,
                )
                .bind(article_number)
                .fetch_optional(&*self.pool)
                .await?
            }
        };

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.get("id");
        let images = self.get_images(id).await?;

        Ok(Some(PersistedProduct {
            id,
            article_number: row.get("article_number"),
            color_id: row.get("color_id"),
            ean: row.get("ean"),
            name: row.get("name"),
            description: row.get("description"),
            material: row.get("material"),
            category: row.get("category"),
            price: row.get("price"),
            source_url: row.get("source_url"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            images,
        }))
    }

    async fn get_images(&self, product_id: i64) -> Result<Vec<ImageAsset>> {
        let rows = sqlx::query(
            r#"
            SELECT url, data, position, is_primary
            FROM product_images WHERE product_id = ? ORDER BY position ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ImageAsset {
                url: row.get("url"),
                data: row.get("data"),
                position: row.get("position"),
                is_primary: row.get("is_primary"),
            })
            .collect())
    }

    /// Total number of stored products.
    pub async fn count_products(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count)
    }
}
