//! Produces the union candidate pool for one request by fanning out
//! three independent branches — latent, popularity, content — and
//! merging them with a stable, order-preserving dedupe. Ordering is
//! observable and intentional: latent evidence wins ties over
//! content, which wins over pure popularity.

use crate::content_recall;
use rand::seq::SliceRandom;
use reco_artifact_loader::ArtifactLoader;
use reco_core::types::ItemId;
use reco_vector_index::VectorIndex;
use std::collections::HashSet;

/// Per-request recall inputs.
pub struct RecallRequest<'a> {
    pub user_id: Option<&'a str>,
    pub anchor: Option<&'a ItemId>,
    pub references: &'a [ItemId],
    pub recent_exclusions: &'a [ItemId],
    pub content_only: bool,
    pub k_latent: usize,
    pub k_pop: usize,
    pub k_content: usize,
}

/// Runs the latent branch: score every item against the user's
/// latent vector and keep the top `k` rows in descending score order.
fn latent_branch(loader: &ArtifactLoader, user_id: &str, k: usize) -> Vec<ItemId> {
    let Some(user_vector) = loader.user_vector(user_id) else {
        return Vec::new();
    };

    let mut scored: Vec<(ItemId, f32)> = loader
        .row_item_map()
        .iter()
        .filter_map(|(&row, item_id)| {
            loader
                .item_vector_by_row(row)
                .map(|item_vector| (item_id.clone(), user_vector.dot(&item_vector)))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Popularity branch. The tail of the over-fetched buffer is shuffled
/// to add diversity while a top prefix (20%) stays fixed in place.
fn popularity_branch(
    loader: &ArtifactLoader,
    exclude: &HashSet<ItemId>,
    k: usize,
    rng: &mut impl rand::Rng,
) -> Vec<ItemId> {
    let mut ranked: Vec<(ItemId, f32)> = loader
        .row_item_map()
        .values()
        .filter(|id| !exclude.contains(*id))
        .map(|id| {
            let (popularity_score, _rating_score, _found) = loader.popularity(id);
            (id.clone(), popularity_score)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut buffer: Vec<ItemId> = ranked.into_iter().take(2 * k).map(|(id, _)| id).collect();

    let prefix_len = (buffer.len() as f32 * 0.2).round() as usize;
    if prefix_len < buffer.len() {
        buffer[prefix_len..].shuffle(rng);
    }

    buffer.truncate(k);
    buffer
}

/// Runs all three branches per §4.5 and merges them with a stable,
/// order-preserving dedupe (Latent ⧺ Content ⧺ Popularity).
pub async fn recall(
    loader: &ArtifactLoader,
    vector_index: &dyn VectorIndex,
    request: &RecallRequest<'_>,
    rng: &mut impl rand::Rng,
) -> Vec<ItemId> {
    let mut latent = Vec::new();
    let mut popularity = Vec::new();

    if !request.content_only {
        if let Some(user_id) = request.user_id {
            latent = latent_branch(loader, user_id, request.k_latent);
        }

        let mut pop_exclude: HashSet<ItemId> = latent.iter().cloned().collect();
        pop_exclude.extend(request.recent_exclusions.iter().cloned());
        popularity = popularity_branch(loader, &pop_exclude, request.k_pop, rng);
    }

    let mut content = Vec::new();
    if request.anchor.is_some() || !request.references.is_empty() {
        let mut content_exclude: HashSet<ItemId> = latent.iter().cloned().collect();
        content_exclude.extend(popularity.iter().cloned());

        content = if let Some(anchor) = request.anchor {
            content_recall::recall_by_anchor(
                vector_index,
                anchor,
                &content_exclude,
                request.k_content,
            )
            .await
        } else {
            content_recall::recall_by_references(
                vector_index,
                request.references,
                &content_exclude,
                request.k_content,
            )
            .await
        };
    }

    merge_branches(latent, content, popularity)
}

/// Stable, order-preserving dedupe: Latent ⧺ Content ⧺ Popularity,
/// first occurrence wins.
fn merge_branches(latent: Vec<ItemId>, content: Vec<ItemId>, popularity: Vec<ItemId>) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    latent
        .into_iter()
        .chain(content)
        .chain(popularity)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
