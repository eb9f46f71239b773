#![warn(clippy::unwrap_used)]

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;

use async_trait::async_trait;
use reco_core::types::{CatalogItem, Category, ItemId};
use std::collections::HashMap;

/// Read-only access to the external relational product catalog. The
/// core never owns this data — schema and ingestion are out of scope
/// (see PURPOSE & SCOPE); this trait is the seam the core consumes it
/// through.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_item(&self, item_id: &ItemId) -> Option<CatalogItem>;

    async fn get_items(&self, item_ids: &[ItemId]) -> HashMap<ItemId, CatalogItem>;

    /// Items sharing `category`, scored by mean_rating *
    /// log(rating_count + 1), descending. Used by the product-detail
    /// fallback when Content Recall yields nothing (see
    /// Recommendation Orchestrator).
    async fn category_fallback(
        &self,
        category: &Category,
        exclude: &[ItemId],
        k: usize,
    ) -> Vec<ItemId>;
}
