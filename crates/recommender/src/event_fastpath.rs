//! Accepts a user event and commits it to short-term context with
//! strict latency: the context write is synchronous, the durable
//! write is scheduled as a background task, and the caller never
//! waits on durability.

use reco_catalog_client::CatalogClient;
use reco_context_store::ContextStore;
use reco_core::event_bus::EventSink;
use reco_core::types::InteractionEvent;
use std::sync::Arc;

pub struct EventFastPath {
    context_store: Arc<dyn ContextStore>,
    catalog: Arc<dyn CatalogClient>,
    durable_log: Arc<dyn EventSink>,
}

impl EventFastPath {
    pub fn new(
        context_store: Arc<dyn ContextStore>,
        catalog: Arc<dyn CatalogClient>,
        durable_log: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            context_store,
            catalog,
            durable_log,
        }
    }

    /// Commits `event` to short-term context synchronously, then
    /// schedules the durable write and returns. The asynchronous
    /// durable write's failure is logged but never propagated; the
    /// context write's failure is logged and degrades re-ranking
    /// rules 1 and 2 on the next read, but does not fail this call.
    pub async fn record(&self, event: InteractionEvent) {
        let category = self
            .catalog
            .get_item(&event.item_id)
            .await
            .and_then(|item| item.category);

        self.context_store
            .touch_recent(&event.user_id, &event.item_id, category.as_ref())
            .await;

        // The sink schedules its own background write and logs any
        // drop internally (see durable-log's bounded channel); nothing
        // here can fail on the caller's behalf.
        self.durable_log.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_catalog_client::InMemoryCatalog;
    use reco_context_store::InMemoryContextStore;
    use reco_core::event_bus::CaptureSink;
    use reco_core::types::{CatalogItem, EventKind};

    fn sample_event() -> InteractionEvent {
        InteractionEvent {
            user_id: "U1".to_string(),
            item_id: "I1".to_string(),
            event_kind: EventKind::View,
            ts: chrono::Utc::now(),
            metadata: serde_json::json!({}),
        }
    }

    fn catalog_with_widget() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.insert(CatalogItem {
            item_id: "I1".to_string(),
            family_id: "F1".to_string(),
            title: "Widget".to_string(),
            category: Some("Tools".to_string()),
            brand: Some("Acme".to_string()),
            avg_rating: None,
            rating_count: None,
            image_url: None,
        });
        catalog
    }

    #[tokio::test]
    async fn record_is_observable_in_context_and_durable_log() {
        let context_store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::default());
        let sink = Arc::new(CaptureSink::default());
        let fast_path = EventFastPath::new(
            context_store.clone(),
            Arc::new(catalog_with_widget()),
            sink.clone(),
        );

        fast_path.record(sample_event()).await;

        assert_eq!(sink.count(), 1);
        let recent = context_store.get_recent_items(&"U1".to_string()).await;
        assert_eq!(recent, vec!["I1".to_string()]);
        let categories = context_store.get_recent_categories(&"U1".to_string()).await;
        assert_eq!(categories.get("Tools"), Some(&1));
    }

    #[tokio::test]
    async fn catalog_lookup_failure_still_commits_context_and_durable_log() {
        let context_store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::default());
        let sink = Arc::new(CaptureSink::default());
        let fast_path = EventFastPath::new(
            context_store.clone(),
            Arc::new(InMemoryCatalog::new()),
            sink.clone(),
        );

        fast_path.record(sample_event()).await;

        assert_eq!(sink.count(), 1);
        let recent = context_store.get_recent_items(&"U1".to_string()).await;
        assert_eq!(recent, vec!["I1".to_string()]);
        // No category known for this item, so the category counter never moved.
        let categories = context_store.get_recent_categories(&"U1".to_string()).await;
        assert!(categories.is_empty());
    }
}
