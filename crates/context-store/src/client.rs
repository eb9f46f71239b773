//! Redis-backed short-term context store.
//!
//! Key schema (see EXTERNAL INTERFACES):
//!   user:<UserId>:recent_items       (list, length <= 20, TTL)
//!   user:<UserId>:recent_categories  (hash, TTL)
//!   user:<UserId>:last_active        (string, unix-second, TTL)
//!
//! All operations are best-effort: a Redis failure is logged and
//! degrades to an empty read or a dropped write, never an error
//! surfaced to the caller — ContextStoreUnavailable is a soft failure
//! kind (see ERROR HANDLING DESIGN).

use async_trait::async_trait;
use chrono::Utc;
use reco_core::config::ContextStoreConfig;
use reco_core::types::{Category, ItemId, ShortTermContext, UserId};
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, warn};

const MAX_RECENT_ITEMS: isize = 19; // LTRIM keeps indices 0..=19 -> 20 entries

/// The read/write surface the Event Fast-path and the Re-ranker need.
/// Lets tests swap in an in-memory double instead of a live Redis.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn touch_recent(&self, user_id: &UserId, item_id: &ItemId, category: Option<&Category>);
    async fn get_recent_items(&self, user_id: &UserId) -> Vec<ItemId>;
    async fn get_recent_categories(&self, user_id: &UserId) -> HashMap<Category, u64>;
    async fn get_last_active(&self, user_id: &UserId) -> Option<i64>;

    async fn short_term_context(&self, user_id: &UserId) -> ShortTermContext {
        ShortTermContext {
            recent_items: self.get_recent_items(user_id).await,
            recent_categories: self.get_recent_categories(user_id).await,
            last_active: self.get_last_active(user_id).await,
        }
    }
}

pub struct ContextStoreClient {
    client: redis::Client,
    ttl_secs: u64,
}

impl ContextStoreClient {
    pub async fn new(config: &ContextStoreConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(response = %pong, "context store connection established");

        Ok(Self {
            client,
            ttl_secs: config.context_ttl_seconds,
        })
    }

    async fn touch_recent_inner(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        category: Option<&Category>,
    ) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let items_key = format!("user:{user_id}:recent_items");
        let _: () = conn.lpush(&items_key, item_id).await?;
        let _: () = conn.ltrim(&items_key, 0, MAX_RECENT_ITEMS).await?;
        let _: () = conn.expire(&items_key, self.ttl_secs as i64).await?;

        if let Some(category) = category {
            let categories_key = format!("user:{user_id}:recent_categories");
            let _: () = conn.hincr(&categories_key, category, 1i64).await?;
            let _: () = conn.expire(&categories_key, self.ttl_secs as i64).await?;
        }

        let last_active_key = format!("user:{user_id}:last_active");
        let _: () = conn
            .set_ex(&last_active_key, Utc::now().timestamp(), self.ttl_secs)
            .await?;

        Ok(())
    }

    async fn get_recent_items_inner(&self, user_id: &UserId) -> anyhow::Result<Vec<ItemId>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("user:{user_id}:recent_items");
        let items: Vec<String> = conn.lrange(&key, 0, MAX_RECENT_ITEMS).await?;
        Ok(items)
    }

    async fn get_recent_categories_inner(
        &self,
        user_id: &UserId,
    ) -> anyhow::Result<HashMap<Category, u64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("user:{user_id}:recent_categories");
        let map: HashMap<String, u64> = conn.hgetall(&key).await?;
        Ok(map)
    }
}

#[async_trait]
impl ContextStore for ContextStoreClient {
    /// Push `item_id` to the head of the user's recent-items list,
    /// trim to 20, refresh TTL; bump the category counter if given;
    /// stamp last_active. Best-effort: failures are logged, not
    /// propagated.
    async fn touch_recent(&self, user_id: &UserId, item_id: &ItemId, category: Option<&Category>) {
        match self.touch_recent_inner(user_id, item_id, category).await {
            Ok(()) => metrics::counter!("context_store.writes").increment(1),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "context store write failed, dropping");
                metrics::counter!("context_store.write_errors").increment(1);
            }
        }
    }

    /// Newest-first, length <= 20. Empty on any store failure.
    async fn get_recent_items(&self, user_id: &UserId) -> Vec<ItemId> {
        match self.get_recent_items_inner(user_id).await {
            Ok(items) => {
                metrics::counter!("context_store.reads").increment(1);
                items
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "context store read failed, returning empty");
                metrics::counter!("context_store.read_errors").increment(1);
                Vec::new()
            }
        }
    }

    /// Category -> count. Empty map on any store failure.
    async fn get_recent_categories(&self, user_id: &UserId) -> HashMap<Category, u64> {
        match self.get_recent_categories_inner(user_id).await {
            Ok(map) => {
                metrics::counter!("context_store.reads").increment(1);
                map
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "context store read failed, returning empty");
                metrics::counter!("context_store.read_errors").increment(1);
                HashMap::new()
            }
        }
    }

    async fn get_last_active(&self, user_id: &UserId) -> Option<i64> {
        let Some(mut conn) = self.client.get_multiplexed_async_connection().await.ok() else {
            metrics::counter!("context_store.read_errors").increment(1);
            return None;
        };
        let key = format!("user:{user_id}:last_active");
        let value = conn.get::<_, Option<i64>>(&key).await.ok().flatten();
        metrics::counter!("context_store.reads").increment(1);
        value
    }
}

/// In-memory double for tests: no TTL, no network.
#[derive(Default)]
pub struct InMemoryContextStore {
    inner: std::sync::Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    recent_items: HashMap<UserId, Vec<ItemId>>,
    recent_categories: HashMap<UserId, HashMap<Category, u64>>,
    last_active: HashMap<UserId, i64>,
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn touch_recent(&self, user_id: &UserId, item_id: &ItemId, category: Option<&Category>) {
        let mut state = self.inner.lock().expect("context store mutex poisoned");
        let items = state.recent_items.entry(user_id.clone()).or_default();
        items.insert(0, item_id.clone());
        items.truncate(20);

        if let Some(category) = category {
            *state
                .recent_categories
                .entry(user_id.clone())
                .or_default()
                .entry(category.clone())
                .or_insert(0) += 1;
        }

        state.last_active.insert(user_id.clone(), Utc::now().timestamp());
    }

    async fn get_recent_items(&self, user_id: &UserId) -> Vec<ItemId> {
        self.inner
            .lock()
            .expect("context store mutex poisoned")
            .recent_items
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn get_recent_categories(&self, user_id: &UserId) -> HashMap<Category, u64> {
        self.inner
            .lock()
            .expect("context store mutex poisoned")
            .recent_categories
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn get_last_active(&self, user_id: &UserId) -> Option<i64> {
        self.inner
            .lock()
            .expect("context store mutex poisoned")
            .last_active
            .get(user_id)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_tracks_recent_items_and_categories() {
        let store = InMemoryContextStore::default();
        let user = "U1".to_string();

        store.touch_recent(&user, &"I1".to_string(), Some(&"Electronics".to_string())).await;
        store.touch_recent(&user, &"I2".to_string(), Some(&"Electronics".to_string())).await;

        let items = store.get_recent_items(&user).await;
        assert_eq!(items, vec!["I2".to_string(), "I1".to_string()]);

        let categories = store.get_recent_categories(&user).await;
        assert_eq!(categories.get("Electronics"), Some(&2));
        assert!(store.get_last_active(&user).await.is_some());
    }
}
