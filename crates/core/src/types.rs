use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, globally unique item identifier.
pub type ItemId = String;

/// Opaque product-family identifier; an item may be its own family
/// when no family is known.
pub type FamilyId = String;

/// Opaque, session-stable user identifier.
pub type UserId = String;

/// A coarse taxonomic label attached to an item by the catalog.
pub type Category = String;

/// Fields the core actually consumes off the catalog, in place of the
/// source's arbitrary `raw_signals`/`metadata` maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSignals {
    pub category: Option<Category>,
    pub family_id: Option<FamilyId>,
    pub avg_rating: Option<f32>,
    pub rating_count: Option<u32>,
}

/// An ItemId proposed by recall, prior to ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub item_id: ItemId,
    pub mf_score: Option<f32>,
    pub content_score: Option<f32>,
    pub raw_signals: Option<RawSignals>,
}

impl Candidate {
    pub fn new(item_id: impl Into<ItemId>) -> Self {
        Self {
            item_id: item_id.into(),
            mf_score: None,
            content_score: None,
            raw_signals: None,
        }
    }
}

/// Feature vector in the pinned order [mf_score, popularity_score,
/// rating_score, content_score].
pub type FeatureVector = [f32; 4];

pub const FEATURE_ORDER: [&str; 4] =
    ["mf_score", "popularity_score", "rating_score", "content_score"];

/// Output of the Ranker for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub item_id: ItemId,
    pub score: f32,
    pub rank_position: usize,
    pub category: Option<Category>,
    pub rating_count: Option<u32>,
    pub family_id: Option<FamilyId>,
}

/// Output of the Re-ranker: adjusted score plus the ordered list of
/// rule tags that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReRankedItem {
    pub item_id: ItemId,
    pub raw_score: f32,
    pub adjusted_score: f32,
    pub rank_position: usize,
    pub applied_rules: Vec<String>,
    pub category: Option<Category>,
    pub family_id: Option<FamilyId>,
}

/// Short-term, per-user context as read from the Context Store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortTermContext {
    /// Newest-first, length <= 20.
    pub recent_items: Vec<ItemId>,
    pub recent_categories: std::collections::HashMap<Category, u64>,
    pub last_active: Option<i64>,
}

/// A catalog record joined onto final recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: ItemId,
    pub family_id: FamilyId,
    pub title: String,
    pub category: Option<Category>,
    pub brand: Option<String>,
    pub avg_rating: Option<f32>,
    pub rating_count: Option<u32>,
    pub image_url: Option<String>,
}

/// Kinds of user event the Event Fast-path accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    Click,
    AddToCart,
    Purchase,
    Rate,
}

/// A user interaction, scheduled for durable logging by the Event
/// Fast-path and fed to the short-term Context Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub event_kind: EventKind,
    pub ts: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// A single item in a recommendation response, after the catalog join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub rank_position: usize,
    pub score: f32,
    pub title: Option<String>,
    pub category: Option<Category>,
    pub image_url: Option<String>,
    pub applied_rules: Vec<String>,
}
