//! Postgres-backed catalog reader. Grounded on the original system's
//! relational product schema; the core only ever reads it.

use crate::CatalogClient;
use async_trait::async_trait;
use reco_core::config::CatalogConfig;
use reco_core::types::{CatalogItem, Category, ItemId};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

#[derive(FromRow)]
struct CatalogRow {
    item_id: String,
    family_id: String,
    title: String,
    category: Option<String>,
    brand: Option<String>,
    avg_rating: Option<f32>,
    rating_count: Option<i32>,
    image_url: Option<String>,
}

impl From<CatalogRow> for CatalogItem {
    fn from(row: CatalogRow) -> Self {
        CatalogItem {
            item_id: row.item_id,
            family_id: row.family_id,
            title: row.title,
            category: row.category,
            brand: row.brand,
            avg_rating: row.avg_rating,
            rating_count: row.rating_count.map(|c| c.max(0) as u32),
            image_url: row.image_url,
        }
    }
}

pub struct PostgresCatalog {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresCatalog {
    pub async fn connect(config: &CatalogConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.database_url)
            .await?;
        Ok(Self {
            pool,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

#[async_trait]
impl CatalogClient for PostgresCatalog {
    async fn get_item(&self, item_id: &ItemId) -> Option<CatalogItem> {
        let query = sqlx::query_as::<_, CatalogRow>(
            "SELECT item_id, family_id, title, category, brand, avg_rating, rating_count, image_url
             FROM items WHERE item_id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool);

        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(row)) => row.map(CatalogItem::from),
            Ok(Err(e)) => {
                warn!(item_id = %item_id, error = %e, "catalog lookup failed");
                None
            }
            Err(_) => {
                warn!(item_id = %item_id, "catalog lookup timed out");
                None
            }
        }
    }

    async fn get_items(&self, item_ids: &[ItemId]) -> HashMap<ItemId, CatalogItem> {
        if item_ids.is_empty() {
            return HashMap::new();
        }

        let query = sqlx::query_as::<_, CatalogRow>(
            "SELECT item_id, family_id, title, category, brand, avg_rating, rating_count, image_url
             FROM items WHERE item_id = ANY($1)",
        )
        .bind(item_ids)
        .fetch_all(&self.pool);

        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(rows)) => rows
                .into_iter()
                .map(|r| (r.item_id.clone(), CatalogItem::from(r)))
                .collect(),
            Ok(Err(e)) => {
                warn!(error = %e, "catalog batch lookup failed");
                HashMap::new()
            }
            Err(_) => {
                warn!("catalog batch lookup timed out");
                HashMap::new()
            }
        }
    }

    async fn category_fallback(
        &self,
        category: &Category,
        exclude: &[ItemId],
        k: usize,
    ) -> Vec<ItemId> {
        let query = sqlx::query_as::<_, CatalogRow>(
            "SELECT item_id, family_id, title, category, brand, avg_rating, rating_count, image_url
             FROM items
             WHERE category = $1 AND NOT (item_id = ANY($2))
             ORDER BY COALESCE(avg_rating, 0) * ln(COALESCE(rating_count, 0) + 1) DESC
             LIMIT $3",
        )
        .bind(category)
        .bind(exclude)
        .bind(k as i64)
        .fetch_all(&self.pool);

        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(rows)) => rows.into_iter().map(|r| r.item_id).collect(),
            Ok(Err(e)) => {
                warn!(category = %category, error = %e, "category fallback query failed");
                Vec::new()
            }
            Err(_) => {
                warn!(category = %category, "category fallback query timed out");
                Vec::new()
            }
        }
    }
}
