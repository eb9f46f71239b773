//! Builds the fixed-order feature matrix the Ranker consumes. Never
//! looks inside the ranker and never fits anything — purely a
//! per-candidate lookup-and-combine step.

use reco_artifact_loader::ArtifactLoader;
use reco_core::types::{Candidate, FeatureVector};
use std::collections::HashMap;

/// Assembles one [`FeatureVector`] per candidate, in the pinned order
/// `[mf_score, popularity_score, rating_score, content_score]`.
pub fn assemble(
    loader: &ArtifactLoader,
    user_id: Option<&str>,
    candidates: &[Candidate],
    content_scores: &HashMap<String, f32>,
    content_boost: f32,
) -> Vec<FeatureVector> {
    let user_row = user_id.and_then(|u| loader.user_row_index(u));

    candidates
        .iter()
        .map(|candidate| {
            let mf_score = match (user_row, loader.row_of_item(&candidate.item_id)) {
                (Some(_), Some(item_row)) => {
                    // Safe because user_row_index and row_of_item agree
                    // with the same loader instance.
                    let user_id = user_id.expect("user_row implies user_id");
                    loader
                        .user_vector(user_id)
                        .zip(loader.item_vector_by_row(item_row))
                        .map(|(u, v)| u.dot(&v))
                        .unwrap_or(0.0)
                }
                _ => 0.0,
            };

            let (popularity_score, table_rating_score, found) = loader.popularity(&candidate.item_id);
            let rating_score = rating_score(found, table_rating_score, candidate);
            let content_score = content_score(&candidate.item_id, content_scores, content_boost);

            [mf_score, popularity_score, rating_score, content_score]
        })
        .collect()
}

/// Rating sub-score: the popularity table's precomputed value when
/// present, otherwise `(avg_rating - 1) / 4` clamped to `[0, 1]`.
fn rating_score(found_in_table: bool, table_value: f32, candidate: &Candidate) -> f32 {
    if found_in_table {
        return table_value;
    }
    candidate
        .raw_signals
        .as_ref()
        .and_then(|s| s.avg_rating)
        .map(|avg| ((avg - 1.0) / 4.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Content sub-score: externally supplied similarity, boosted and
/// clamped to `[0, 1]`.
fn content_score(item_id: &str, content_scores: &HashMap<String, f32>, content_boost: f32) -> f32 {
    content_scores
        .get(item_id)
        .copied()
        .map(|similarity| (similarity * content_boost).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core::types::RawSignals;

    fn candidate_with_rating(avg_rating: f32) -> Candidate {
        Candidate {
            item_id: "I1".to_string(),
            mf_score: None,
            content_score: None,
            raw_signals: Some(RawSignals {
                category: None,
                family_id: None,
                avg_rating: Some(avg_rating),
                rating_count: Some(10),
            }),
        }
    }

    #[test]
    fn rating_score_prefers_popularity_table_over_catalog() {
        let candidate = candidate_with_rating(4.2);
        assert_eq!(rating_score(true, 0.33, &candidate), 0.33);
    }

    #[test]
    fn rating_score_falls_back_to_catalog_avg_rating() {
        let candidate = candidate_with_rating(4.2);
        let score = rating_score(false, 0.0, &candidate);
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn rating_score_without_any_signal_is_zero() {
        let candidate = Candidate::new("I1");
        assert_eq!(rating_score(false, 0.0, &candidate), 0.0);
    }

    #[test]
    fn content_score_applies_boost_and_clamps() {
        let scores = HashMap::from([("I1".to_string(), 0.5_f32)]);
        assert_eq!(content_score("I1", &scores, 2.5), 1.0);
        assert_eq!(content_score("missing", &scores, 2.5), 0.0);
    }
}
