//! Reduces popularity/latent dominance by re-scaling each feature
//! column to a common range before the Ranker sees it. Statistics are
//! computed per request and never persisted.

use reco_core::config::RankerTunables;
use reco_core::types::FeatureVector;

/// `mf_score`, `popularity_score`, `rating_score`, `content_score`.
const MF: usize = 0;
const POPULARITY: usize = 1;
const RATING: usize = 2;
const CONTENT: usize = 3;

/// Normalizes the columns subject to dominance (`mf_score`,
/// `popularity_score`) by the configured method, clamps the
/// already-bounded columns (`rating_score`, `content_score`), then
/// applies feature weights. A no-op below two candidates.
pub fn normalize(features: &mut [FeatureVector], tunables: &RankerTunables) {
    if features.len() < 2 {
        return;
    }

    match tunables.normalization_method.as_str() {
        "z_score" => normalize_column(features, MF, z_score),
        _ => normalize_column(features, MF, min_max),
    }
    match tunables.normalization_method.as_str() {
        "z_score" => normalize_column(features, POPULARITY, z_score),
        _ => normalize_column(features, POPULARITY, min_max),
    }

    for row in features.iter_mut() {
        row[RATING] = row[RATING].clamp(0.0, 1.0);
        row[CONTENT] = row[CONTENT].clamp(0.0, 1.0);
    }

    for row in features.iter_mut() {
        row[MF] *= tunables.mf_weight;
        row[POPULARITY] *= tunables.popularity_weight;
        row[RATING] *= tunables.rating_weight;
        row[CONTENT] *= tunables.content_weight;
    }
}

fn normalize_column(features: &mut [FeatureVector], column: usize, method: fn(f32, &[f32]) -> f32) {
    let values: Vec<f32> = features.iter().map(|row| row[column]).collect();
    for row in features.iter_mut() {
        row[column] = method(row[column], &values);
    }
}

fn min_max(x: f32, values: &[f32]) -> f32 {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return 0.0;
    }
    ((x - min) / (max - min)).clamp(0.0, 1.0)
}

fn z_score(x: f32, values: &[f32]) -> f32 {
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
    let std = variance.sqrt();
    if std < f32::EPSILON {
        return 0.0;
    }
    let z = (x - mean) / std;
    sigmoid(z).clamp(0.0, 1.0)
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}
