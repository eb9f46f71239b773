//! Content-similarity recall over the vector index. Two retrieval
//! modes (single anchor, weighted references) plus a batch-scoring
//! path used by the Feature Assembler rather than by recall itself.

use reco_core::types::ItemId;
use reco_vector_index::VectorIndex;
use std::collections::{HashMap, HashSet};

const MAX_REFERENCES: usize = 10;

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

/// Mode (a): items similar to a single anchor.
pub async fn recall_by_anchor(
    vector_index: &dyn VectorIndex,
    anchor: &ItemId,
    exclude: &HashSet<ItemId>,
    k: usize,
) -> Vec<ItemId> {
    let Some(vector) = vector_index.get_vector(anchor).await else {
        return Vec::new();
    };

    let fetch = k + exclude.len();
    vector_index
        .k_nearest(&vector, fetch, exclude)
        .await
        .into_iter()
        .map(|(id, _sim)| id)
        .take(k)
        .collect()
}

/// Mode (b): weighted aggregation across up to [`MAX_REFERENCES`]
/// reference items. Each reference contributes its own nearest
/// neighbors; an item's aggregated score is the best similarity
/// observed across all references.
pub async fn recall_by_references(
    vector_index: &dyn VectorIndex,
    references: &[ItemId],
    exclude: &HashSet<ItemId>,
    k: usize,
) -> Vec<ItemId> {
    let references = &references[..references.len().min(MAX_REFERENCES)];
    if references.is_empty() {
        return Vec::new();
    }

    let per_ref_quota = k / references.len() + 5;
    let mut best: HashMap<ItemId, f32> = HashMap::new();

    for reference in references {
        let Some(vector) = vector_index.get_vector(reference).await else {
            continue;
        };
        for (id, similarity) in vector_index
            .k_nearest(&vector, per_ref_quota, exclude)
            .await
        {
            best.entry(id)
                .and_modify(|existing| {
                    if similarity > *existing {
                        *existing = similarity;
                    }
                })
                .or_insert(similarity);
        }
    }

    let mut ranked: Vec<(ItemId, f32)> = best
        .into_iter()
        .filter(|(id, _)| !exclude.contains(id))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(k).map(|(id, _)| id).collect()
}

/// Batch scoring used by the Feature Assembler: each candidate's
/// cosine similarity against every reference vector, aggregated with
/// equal (or caller-supplied) weights and clamped to `[0, 1]`.
pub async fn batch_content_scores(
    vector_index: &dyn VectorIndex,
    candidates: &[ItemId],
    references: &[ItemId],
    weights: Option<&[f32]>,
) -> HashMap<ItemId, f32> {
    if candidates.is_empty() || references.is_empty() {
        return HashMap::new();
    }

    let references = &references[..references.len().min(MAX_REFERENCES)];
    let mut reference_vectors = Vec::with_capacity(references.len());
    for reference in references {
        if let Some(vector) = vector_index.get_vector(reference).await {
            reference_vectors.push(vector);
        }
    }
    if reference_vectors.is_empty() {
        return HashMap::new();
    }

    let equal_weight = 1.0 / reference_vectors.len() as f32;
    let weights: Vec<f32> = match weights {
        Some(w) if w.len() == reference_vectors.len() => w.to_vec(),
        _ => vec![equal_weight; reference_vectors.len()],
    };

    let mut scores = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(candidate_vector) = vector_index.get_vector(candidate).await else {
            continue;
        };
        let sum: f32 = reference_vectors
            .iter()
            .zip(&weights)
            .map(|(r, w)| cosine(&candidate_vector, r) * w)
            .sum();
        scores.insert(candidate.clone(), sum.clamp(0.0, 1.0));
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_vector_index::InMemoryVectorIndex;

    fn index() -> InMemoryVectorIndex {
        let mut idx = InMemoryVectorIndex::default();
        idx.insert("anchor".into(), vec![1.0, 0.0]);
        idx.insert("close".into(), vec![0.9, 0.1]);
        idx.insert("far".into(), vec![0.0, 1.0]);
        idx
    }

    #[tokio::test]
    async fn anchor_mode_excludes_self_and_respects_k() {
        let idx = index();
        let exclude: HashSet<ItemId> = ["anchor".to_string()].into_iter().collect();
        let result = recall_by_anchor(&idx, &"anchor".to_string(), &exclude, 1).await;
        assert_eq!(result, vec!["close".to_string()]);
    }

    #[tokio::test]
    async fn reference_mode_aggregates_best_similarity() {
        let idx = index();
        let exclude = HashSet::new();
        let result =
            recall_by_references(&idx, &["anchor".to_string()], &exclude, 2).await;
        assert_eq!(result[0], "close".to_string());
    }

    #[tokio::test]
    async fn batch_scores_clamp_to_unit_interval() {
        let idx = index();
        let scores = batch_content_scores(
            &idx,
            &["close".to_string(), "far".to_string()],
            &["anchor".to_string()],
            None,
        )
        .await;
        assert!(scores["close"] <= 1.0 && scores["close"] >= 0.0);
        assert!(scores["far"] < scores["close"]);
    }
}
