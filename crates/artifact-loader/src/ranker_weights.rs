//! `ranker.bin` — a bincode-serialized linear model: four coefficients
//! in the pinned feature order plus an intercept.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerWeights {
    pub w: [f64; 4],
    pub intercept: f64,
    pub feature_order: [String; 4],
}

impl RankerWeights {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("reading ranker file {}: {e}", path.display()))?;
        let weights: RankerWeights = bincode::deserialize(&bytes)
            .map_err(|e| anyhow::anyhow!("decoding ranker file {}: {e}", path.display()))?;

        let expected = reco_core::types::FEATURE_ORDER;
        if weights.feature_order.iter().map(String::as_str).ne(expected) {
            anyhow::bail!(
                "ranker feature order {:?} does not match pinned order {:?}",
                weights.feature_order,
                expected
            );
        }

        Ok(weights)
    }
}
