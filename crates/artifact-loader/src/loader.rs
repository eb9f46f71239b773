//! Loads and validates the immutable offline artifacts the serving
//! core consumes: factor matrices, id maps, the popularity table, and
//! the trained linear ranker. Everything here is read-only after
//! `ArtifactLoader::load` returns — readers share it via `Arc` without
//! locking, mirroring the teacher's "load once, read forever" model
//! lifecycle.

use crate::factors::load_factor_matrix;
use crate::popularity::{load_popularity_table, PopularityEntry};
use crate::ranker_weights::RankerWeights;
use ndarray::{Array2, ArrayView1};
use reco_core::config::ArtifactsConfig;
use reco_core::types::{ItemId, UserId};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub struct ArtifactLoader {
    user_factors: Array2<f32>,
    item_factors: Array2<f32>,
    user_row: HashMap<UserId, usize>,
    row_item: HashMap<usize, ItemId>,
    item_row: HashMap<ItemId, usize>,
    popularity: HashMap<ItemId, PopularityEntry>,
    ranker: RankerWeights,
}

impl ArtifactLoader {
    /// Load and validate all artifacts named by `config`. Fails fast —
    /// the caller is expected to treat any error here as fatal at
    /// startup (see EXTERNAL INTERFACES / Exit conditions).
    pub fn load(config: &ArtifactsConfig) -> anyhow::Result<Self> {
        let dir = Path::new(&config.dir);

        let user_factors = load_factor_matrix(&dir.join(&config.user_factors_file))?;
        let item_factors = load_factor_matrix(&dir.join(&config.item_factors_file))?;

        let user_row: HashMap<UserId, usize> =
            serde_json::from_slice(&std::fs::read(dir.join(&config.user_row_file))?)
                .map_err(|e| anyhow::anyhow!("corrupt user_row map: {e}"))?;

        let row_item_raw: HashMap<String, ItemId> =
            serde_json::from_slice(&std::fs::read(dir.join(&config.row_item_file))?)
                .map_err(|e| anyhow::anyhow!("corrupt row_item map: {e}"))?;
        let mut row_item = HashMap::with_capacity(row_item_raw.len());
        let mut item_row = HashMap::with_capacity(row_item_raw.len());
        for (row_str, item_id) in row_item_raw {
            let row: usize = row_str
                .parse()
                .map_err(|e| anyhow::anyhow!("corrupt row_item key `{row_str}`: {e}"))?;
            item_row.insert(item_id.clone(), row);
            row_item.insert(row, item_id);
        }

        let popularity = load_popularity_table(&dir.join(&config.popularity_file))?;
        let ranker = RankerWeights::load(&dir.join(&config.ranker_file))?;

        let d = user_factors.ncols();
        if d == 0 {
            anyhow::bail!("user factor matrix has zero latent dimension");
        }
        if user_factors.nrows() != user_row.len() {
            anyhow::bail!(
                "user factor matrix has {} rows but user_row maps {} users",
                user_factors.nrows(),
                user_row.len()
            );
        }
        if item_factors.nrows() != row_item.len() {
            anyhow::bail!(
                "item factor matrix has {} rows but row_item maps {} items",
                item_factors.nrows(),
                row_item.len()
            );
        }
        if item_factors.ncols() != d {
            anyhow::bail!(
                "item factor dimension {} does not match user factor dimension {d}",
                item_factors.ncols()
            );
        }

        info!(
            users = user_row.len(),
            items = row_item.len(),
            latent_dim = d,
            popularity_entries = popularity.len(),
            "artifacts loaded"
        );

        Ok(Self {
            user_factors,
            item_factors,
            user_row,
            row_item,
            item_row,
            popularity,
            ranker,
        })
    }

    pub fn user_vector(&self, user_id: &str) -> Option<ArrayView1<'_, f32>> {
        self.user_row
            .get(user_id)
            .map(|&row| self.user_factors.row(row))
    }

    pub fn item_vector_by_row(&self, row: usize) -> Option<ArrayView1<'_, f32>> {
        if row < self.item_factors.nrows() {
            Some(self.item_factors.row(row))
        } else {
            None
        }
    }

    pub fn row_of_item(&self, item_id: &str) -> Option<usize> {
        self.item_row.get(item_id).copied()
    }

    pub fn item_of_row(&self, row: usize) -> Option<&ItemId> {
        self.row_item.get(&row)
    }

    pub fn user_row_index(&self, user_id: &str) -> Option<usize> {
        self.user_row.get(user_id).copied()
    }

    /// (popularity_score, rating_score, found).
    pub fn popularity(&self, item_id: &str) -> (f32, f32, bool) {
        match self.popularity.get(item_id) {
            Some(entry) => (entry.popularity_score, entry.rating_score, true),
            None => (0.0, 0.0, false),
        }
    }

    pub fn ranker(&self) -> (&[f64; 4], f64) {
        (&self.ranker.w, self.ranker.intercept)
    }

    pub fn latent_dim(&self) -> usize {
        self.user_factors.ncols()
    }

    pub fn item_matrix(&self) -> &Array2<f32> {
        &self.item_factors
    }

    pub fn row_item_map(&self) -> &HashMap<usize, ItemId> {
        &self.row_item
    }

    pub fn item_count(&self) -> usize {
        self.row_item.len()
    }

    pub fn user_count(&self) -> usize {
        self.user_row.len()
    }
}
