//! Applies the trained linear-plus-sigmoid scoring function. No
//! training, no online update — the weights are fixed at artifact-load
//! time and the feature order is validated against
//! [`reco_core::types::FEATURE_ORDER`] there.

use reco_core::types::{Candidate, FeatureVector, RankedItem};
use tracing::debug;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Scores every candidate as `sigmoid(w . x + b)` and returns a
/// stable descending sort by score — ties keep the incoming
/// (recall-merge) order.
pub fn rank(
    candidates: &[Candidate],
    features: &[FeatureVector],
    weights: &[f64; 4],
    intercept: f64,
    debug_log: bool,
) -> Vec<RankedItem> {
    debug_assert_eq!(candidates.len(), features.len());

    let mut scored: Vec<RankedItem> = candidates
        .iter()
        .zip(features)
        .enumerate()
        .map(|(i, (candidate, feature))| {
            if debug_log && i < 5 {
                debug!(item_id = %candidate.item_id, ?feature, "ranker input");
            }
            let z: f64 = weights
                .iter()
                .zip(feature.iter())
                .map(|(w, x)| w * (*x as f64))
                .sum::<f64>()
                + intercept;
            let score = sigmoid(z) as f32;

            RankedItem {
                item_id: candidate.item_id.clone(),
                score,
                rank_position: 0,
                category: candidate.raw_signals.as_ref().and_then(|s| s.category.clone()),
                rating_count: candidate.raw_signals.as_ref().and_then(|s| s.rating_count),
                family_id: candidate.raw_signals.as_ref().and_then(|s| s.family_id.clone()),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, item) in scored.iter_mut().enumerate() {
        item.rank_position = i + 1;
    }
    scored
}

/// Fallback ranker used on `ModelInferenceError`: scores purely by
/// descending position in the recall list, so the pipeline always
/// degrades to a popularity-flavored ordering instead of failing.
pub fn mock_rank(candidates: &[Candidate]) -> Vec<RankedItem> {
    let n = candidates.len();
    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| RankedItem {
            item_id: candidate.item_id.clone(),
            score: ((n - i) as f32) / (n.max(1) as f32),
            rank_position: i + 1,
            category: candidate.raw_signals.as_ref().and_then(|s| s.category.clone()),
            rating_count: candidate.raw_signals.as_ref().and_then(|s| s.rating_count),
            family_id: candidate.raw_signals.as_ref().and_then(|s| s.family_id.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(ids: &[&str]) -> Vec<Candidate> {
        ids.iter().map(|id| Candidate::new(*id)).collect()
    }

    #[test]
    fn scores_are_in_open_unit_interval() {
        let cands = candidates(&["I1", "I2"]);
        let features = vec![[1.0, 0.5, 0.3, 0.2], [0.0, 0.0, 0.0, 0.0]];
        let ranked = rank(&cands, &features, &[1.0, 1.0, 1.0, 1.0], 0.0, false);
        for item in &ranked {
            assert!(item.score > 0.0 && item.score < 1.0);
        }
    }

    #[test]
    fn sorts_descending_and_assigns_rank_positions() {
        let cands = candidates(&["low", "high"]);
        let features = vec![[0.0, 0.0, 0.0, 0.0], [10.0, 10.0, 10.0, 10.0]];
        let ranked = rank(&cands, &features, &[1.0, 1.0, 1.0, 1.0], 0.0, false);
        assert_eq!(ranked[0].item_id, "high");
        assert_eq!(ranked[0].rank_position, 1);
        assert_eq!(ranked[1].rank_position, 2);
    }

    #[test]
    fn ties_preserve_incoming_order() {
        let cands = candidates(&["first", "second"]);
        let features = vec![[1.0, 1.0, 1.0, 1.0], [1.0, 1.0, 1.0, 1.0]];
        let ranked = rank(&cands, &features, &[1.0, 0.0, 0.0, 0.0], 0.0, false);
        assert_eq!(ranked[0].item_id, "first");
        assert_eq!(ranked[1].item_id, "second");
    }

    #[test]
    fn mock_rank_decreases_monotonically_with_position() {
        let cands = candidates(&["a", "b", "c"]);
        let ranked = mock_rank(&cands);
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked[1].score > ranked[2].score);
    }
}
