//! In-memory catalog fake for tests and for the product-detail
//! fallback's unit coverage.

use crate::CatalogClient;
use async_trait::async_trait;
use reco_core::types::{CatalogItem, Category, ItemId};
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryCatalog {
    items: HashMap<ItemId, CatalogItem>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: CatalogItem) {
        self.items.insert(item.item_id.clone(), item);
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn get_item(&self, item_id: &ItemId) -> Option<CatalogItem> {
        self.items.get(item_id).cloned()
    }

    async fn get_items(&self, item_ids: &[ItemId]) -> HashMap<ItemId, CatalogItem> {
        item_ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| (id.clone(), item.clone())))
            .collect()
    }

    async fn category_fallback(
        &self,
        category: &Category,
        exclude: &[ItemId],
        k: usize,
    ) -> Vec<ItemId> {
        let mut matches: Vec<&CatalogItem> = self
            .items
            .values()
            .filter(|item| item.category.as_ref() == Some(category) && !exclude.contains(&item.item_id))
            .collect();

        matches.sort_by(|a, b| {
            let score_a = a.avg_rating.unwrap_or(0.0) * ((a.rating_count.unwrap_or(0) + 1) as f32).ln();
            let score_b = b.avg_rating.unwrap_or(0.0) * ((b.rating_count.unwrap_or(0) + 1) as f32).ln();
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        matches.into_iter().take(k).map(|item| item.item_id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, category: &str, rating: f32, count: u32) -> CatalogItem {
        CatalogItem {
            item_id: id.to_string(),
            family_id: id.to_string(),
            title: id.to_string(),
            category: Some(category.to_string()),
            brand: None,
            avg_rating: Some(rating),
            rating_count: Some(count),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn category_fallback_orders_by_rating_times_log_count() {
        let mut catalog = InMemoryCatalog::new();
        catalog.insert(item("I1", "Beauty", 4.0, 100));
        catalog.insert(item("I2", "Beauty", 4.9, 2));
        catalog.insert(item("I3", "Electronics", 5.0, 1000));

        let result = catalog
            .category_fallback(&"Beauty".to_string(), &[], 5)
            .await;

        assert_eq!(result, vec!["I1".to_string(), "I2".to_string()]);
    }

    #[tokio::test]
    async fn category_fallback_respects_exclusions() {
        let mut catalog = InMemoryCatalog::new();
        catalog.insert(item("I1", "Beauty", 4.0, 100));
        catalog.insert(item("I2", "Beauty", 3.0, 50));

        let result = catalog
            .category_fallback(&"Beauty".to_string(), &["I1".to_string()], 5)
            .await;

        assert_eq!(result, vec!["I2".to_string()]);
    }
}
