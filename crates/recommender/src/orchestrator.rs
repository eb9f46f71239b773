//! Runs Recall → Feature assembly/scoring → Re-ranking (R → K → X) for
//! one request, then translates the final ItemIds to catalog records.
//! The direct analogue of the teacher's composition-root request flow,
//! specialized to the recommendation pipeline.

use crate::{candidate_recall, content_recall, feature_assembler, ranker, reranker, score_normalizer};
use candidate_recall::RecallRequest;
use reco_artifact_loader::ArtifactLoader;
use reco_catalog_client::CatalogClient;
use reco_context_store::ContextStore;
use reco_core::config::RankerTunables;
use reco_core::error::RecoError;
use reco_core::types::{Candidate, ItemId, RawSignals, Recommendation, ShortTermContext, UserId};
use reco_vector_index::VectorIndex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Caller-selected recall mode (§4.11).
pub enum RecommendationMode {
    /// Homepage / general feed: references are the user's recent
    /// cart/purchase (and optionally view) history.
    Homepage { references: Vec<ItemId> },
    /// Product-detail "similar items": content-only recall anchored on
    /// the current item.
    ProductDetail { anchor: ItemId },
}

pub struct RecommendationRequest {
    pub user_id: Option<UserId>,
    pub mode: RecommendationMode,
    pub recent_exclusions: Vec<ItemId>,
}

pub struct Orchestrator {
    loader: Arc<ArtifactLoader>,
    vector_index: Arc<dyn VectorIndex>,
    catalog: Arc<dyn CatalogClient>,
    context_store: Arc<dyn ContextStore>,
    tunables: RankerTunables,
}

impl Orchestrator {
    pub fn new(
        loader: Arc<ArtifactLoader>,
        vector_index: Arc<dyn VectorIndex>,
        catalog: Arc<dyn CatalogClient>,
        context_store: Arc<dyn ContextStore>,
        tunables: RankerTunables,
    ) -> Self {
        Self {
            loader,
            vector_index,
            catalog,
            context_store,
            tunables,
        }
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, RecoError> {
        let (content_only, anchor, references, content_boost) = match &request.mode {
            RecommendationMode::Homepage { references } => (
                false,
                None,
                references.clone(),
                self.tunables.content_boost_home,
            ),
            RecommendationMode::ProductDetail { anchor } => (
                true,
                Some(anchor.clone()),
                Vec::new(),
                self.tunables.content_boost_detail,
            ),
        };

        let recall_request = RecallRequest {
            user_id: request.user_id.as_deref(),
            anchor: anchor.as_ref(),
            references: &references,
            recent_exclusions: &request.recent_exclusions,
            content_only,
            k_latent: self.tunables.k_latent,
            k_pop: self.tunables.k_pop,
            k_content: self.tunables.k_content,
        };

        let mut rng = rand::thread_rng();
        let mut candidate_ids = candidate_recall::recall(
            &self.loader,
            self.vector_index.as_ref(),
            &recall_request,
            &mut rng,
        )
        .await;

        if candidate_ids.is_empty() {
            if let RecommendationMode::ProductDetail { anchor } = &request.mode {
                candidate_ids = self.product_detail_fallback(anchor).await;
            }
        }

        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let catalog_items = self.catalog.get_items(&candidate_ids).await;
        let candidates = build_candidates(&candidate_ids, &catalog_items);

        let content_scores = match &request.mode {
            RecommendationMode::Homepage { references } if !references.is_empty() => {
                content_recall::batch_content_scores(
                    self.vector_index.as_ref(),
                    &candidate_ids,
                    references,
                    None,
                )
                .await
            }
            RecommendationMode::ProductDetail { anchor } => {
                content_recall::batch_content_scores(
                    self.vector_index.as_ref(),
                    &candidate_ids,
                    std::slice::from_ref(anchor),
                    None,
                )
                .await
            }
            _ => HashMap::new(),
        };

        let mut features = feature_assembler::assemble(
            &self.loader,
            request.user_id.as_deref(),
            &candidates,
            &content_scores,
            content_boost,
        );
        score_normalizer::normalize(&mut features, &self.tunables);

        let (weights, intercept) = self.loader.ranker();
        let mut ranked = ranker::rank(&candidates, &features, weights, intercept, false);
        if ranked.iter().any(|item| !item.score.is_finite()) {
            warn!("ranker produced a non-finite score, falling back to the mock ranker");
            ranked = ranker::mock_rank(&candidates);
        }
        ranked.truncate(self.tunables.top_n_rank);

        let context = match &request.user_id {
            Some(user_id) => self.context_store.short_term_context(user_id).await,
            None => ShortTermContext::default(),
        };

        let reranked = reranker::rerank(&ranked, &context, self.tunables.top_n_final, &self.tunables);

        let final_ids: Vec<ItemId> = reranked.iter().map(|item| item.item_id.clone()).collect();
        let final_catalog = self.catalog.get_items(&final_ids).await;
        if final_catalog.is_empty() {
            return Err(RecoError::Catalog(
                "catalog returned no records for the final recommendation set".to_string(),
            ));
        }

        Ok(join_catalog_and_dedupe(reranked, &final_catalog))
    }

    /// Fallback for product-detail recall that yields nothing: items
    /// sharing the anchor's category, scored by mean_rating *
    /// log(rating_count + 1).
    async fn product_detail_fallback(&self, anchor: &ItemId) -> Vec<ItemId> {
        let Some(category) = self
            .catalog
            .get_item(anchor)
            .await
            .and_then(|item| item.category)
        else {
            return Vec::new();
        };
        self.catalog
            .category_fallback(&category, std::slice::from_ref(anchor), self.tunables.top_n_final)
            .await
    }
}

fn build_candidates(
    candidate_ids: &[ItemId],
    catalog_items: &HashMap<ItemId, reco_core::types::CatalogItem>,
) -> Vec<Candidate> {
    candidate_ids
        .iter()
        .map(|item_id| {
            let raw_signals = catalog_items.get(item_id).map(|item| RawSignals {
                category: item.category.clone(),
                family_id: Some(item.family_id.clone()),
                avg_rating: item.avg_rating,
                rating_count: item.rating_count,
            });
            Candidate {
                item_id: item_id.clone(),
                mf_score: None,
                content_score: None,
                raw_signals,
            }
        })
        .collect()
}

/// Second FamilyId dedup pass using the catalog's (more authoritative)
/// FamilyId, and the catalog join that produces the final response
/// shape.
fn join_catalog_and_dedupe(
    reranked: Vec<reco_core::types::ReRankedItem>,
    final_catalog: &HashMap<ItemId, reco_core::types::CatalogItem>,
) -> Vec<Recommendation> {
    let mut seen_items = std::collections::HashSet::new();
    let mut seen_families = std::collections::HashSet::new();
    let mut recommendations = Vec::new();

    for item in reranked {
        let catalog_item = final_catalog.get(&item.item_id);
        let family_id = catalog_item
            .map(|c| c.family_id.clone())
            .or_else(|| item.family_id.clone())
            .unwrap_or_else(|| item.item_id.clone());

        if seen_items.contains(&item.item_id) || seen_families.contains(&family_id) {
            continue;
        }
        seen_items.insert(item.item_id.clone());
        seen_families.insert(family_id);

        recommendations.push(Recommendation {
            item_id: item.item_id.clone(),
            rank_position: recommendations.len() + 1,
            score: item.adjusted_score,
            title: catalog_item.map(|c| c.title.clone()),
            category: catalog_item
                .and_then(|c| c.category.clone())
                .or_else(|| item.category.clone()),
            image_url: catalog_item.and_then(|c| c.image_url.clone()),
            applied_rules: item.applied_rules,
        });
    }

    recommendations
}
