//! Adapter over an external cosine-similarity vector search service.
//! One L2-normalized embedding per ItemId, keyed by the point id
//! derived in `point_id`. Unreachable-index and not-indexed are both
//! soft failures: operations return an absent/empty result rather
//! than raising (VectorIndexUnavailable, see ERROR HANDLING DESIGN).

use crate::point_id::item_id_to_point_id;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    GetPointsBuilder, PointId as QdrantPointId, SearchPointsBuilder, WithPayloadSelector,
};
use qdrant_client::Qdrant;
use reco_core::config::VectorIndexConfig;
use reco_core::types::ItemId;
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn get_vector(&self, item_id: &ItemId) -> Option<Vec<f32>>;

    /// Ordered descending by cosine similarity, excluding `exclude`.
    async fn k_nearest(
        &self,
        vector: &[f32],
        k: usize,
        exclude: &HashSet<ItemId>,
    ) -> Vec<(ItemId, f32)>;
}

pub struct QdrantVectorIndex {
    client: Qdrant,
    collection_name: String,
    timeout: Duration,
}

impl QdrantVectorIndex {
    pub fn new(config: &VectorIndexConfig) -> anyhow::Result<Self> {
        let client = Qdrant::from_url(&config.url).build()?;
        Ok(Self {
            client,
            collection_name: config.collection_name.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn get_vector(&self, item_id: &ItemId) -> Option<Vec<f32>> {
        let point_id = item_id_to_point_id(item_id);
        let request = GetPointsBuilder::new(&self.collection_name, vec![QdrantPointId::from(point_id)])
            .with_vectors(true)
            .with_payload(false);

        match tokio::time::timeout(self.timeout, self.client.get_points(request)).await {
            Ok(Ok(response)) => response
                .result
                .into_iter()
                .next()
                .and_then(|point| point.vectors)
                .and_then(|vectors| vectors.vectors_options)
                .and_then(|opts| match opts {
                    qdrant_client::qdrant::vectors_output::VectorsOptions::Vector(v) => {
                        Some(v.data)
                    }
                    _ => None,
                }),
            Ok(Err(e)) => {
                warn!(item_id = %item_id, error = %e, "vector index get_vector failed");
                None
            }
            Err(_) => {
                warn!(item_id = %item_id, "vector index get_vector timed out");
                None
            }
        }
    }

    async fn k_nearest(
        &self,
        vector: &[f32],
        k: usize,
        exclude: &HashSet<ItemId>,
    ) -> Vec<(ItemId, f32)> {
        // Over-fetch so that filtering `exclude` locally still leaves k results.
        let fetch = (k + exclude.len()) as u64;
        let request = SearchPointsBuilder::new(&self.collection_name, vector.to_vec(), fetch)
            .with_payload(WithPayloadSelector::from(true));

        let response = match tokio::time::timeout(self.timeout, self.client.search_points(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "vector index k_nearest failed");
                return Vec::new();
            }
            Err(_) => {
                warn!("vector index k_nearest timed out");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(k);
        for scored in response.result {
            let item_id = match scored
                .payload
                .get("item_id")
                .and_then(|v| v.as_str().map(str::to_string))
            {
                Some(id) => id,
                None => continue,
            };
            if exclude.contains(&item_id) {
                continue;
            }
            results.push((item_id, scored.score));
            if results.len() >= k {
                break;
            }
        }
        results
    }
}

/// In-memory fake used by tests and by callers that need deterministic
/// recall without a live Qdrant instance.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    vectors: std::collections::HashMap<ItemId, Vec<f32>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item_id: impl Into<ItemId>, vector: Vec<f32>) {
        self.vectors.insert(item_id.into(), vector);
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn get_vector(&self, item_id: &ItemId) -> Option<Vec<f32>> {
        self.vectors.get(item_id).cloned()
    }

    async fn k_nearest(
        &self,
        vector: &[f32],
        k: usize,
        exclude: &HashSet<ItemId>,
    ) -> Vec<(ItemId, f32)> {
        let mut scored: Vec<(ItemId, f32)> = self
            .vectors
            .iter()
            .filter(|(id, _)| !exclude.contains(*id))
            .map(|(id, v)| (id.clone(), cosine(vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}
