//! Popularity table loader.
//!
//! Reads `popularity.parquet` (columns: item_id, popularity_score,
//! rating_score, optionally interaction_count, mean_rating). When the
//! precomputed score columns are absent — a partially-preprocessed
//! artifact set — falls back to computing them independently from the
//! raw counts, mirroring `normalize_item_popularity`'s
//! log1p-then-min-max treatment of interaction counts:
//! `popularity_score = ln_1p(interaction_count) / ln_1p(max_interaction_count)`.
//! `rating_score` never feeds `popularity_score`; it is its own linear
//! rescaling of `mean_rating`.

use arrow::array::{Array, Float32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use reco_core::types::ItemId;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct PopularityEntry {
    pub popularity_score: f32,
    pub rating_score: f32,
    pub interaction_count: Option<u64>,
    pub mean_rating: Option<f32>,
}

pub fn load_popularity_table(path: &Path) -> anyhow::Result<HashMap<ItemId, PopularityEntry>> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("opening popularity file {}: {e}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| anyhow::anyhow!("reading parquet schema of {}: {e}", path.display()))?;
    let schema = builder.schema().clone();
    let has_popularity_score = schema.field_with_name("popularity_score").is_ok();
    let has_rating_score = schema.field_with_name("rating_score").is_ok();
    let reader = builder.build()?;

    let mut raw: HashMap<ItemId, PopularityEntry> = HashMap::new();

    for batch in reader {
        let batch = batch.map_err(|e| anyhow::anyhow!("reading parquet batch: {e}"))?;
        ingest_batch(&batch, has_popularity_score, has_rating_score, &mut raw)?;
    }

    if !has_popularity_score || !has_rating_score {
        backfill_from_raw_counts(&mut raw);
    }

    Ok(raw)
}

fn ingest_batch(
    batch: &RecordBatch,
    has_popularity_score: bool,
    has_rating_score: bool,
    out: &mut HashMap<ItemId, PopularityEntry>,
) -> anyhow::Result<()> {
    let item_ids = column_as_strings(batch, "item_id")?;

    let popularity_scores = if has_popularity_score {
        Some(column_as_f32(batch, "popularity_score")?)
    } else {
        None
    };
    let rating_scores = if has_rating_score {
        Some(column_as_f32(batch, "rating_score")?)
    } else {
        None
    };
    let interaction_counts = column_as_u64_opt(batch, "interaction_count");
    let mean_ratings = column_as_f32_opt(batch, "mean_rating");

    for i in 0..batch.num_rows() {
        let item_id = item_ids.value(i).to_string();
        let entry = out.entry(item_id).or_default();
        if let Some(ref arr) = popularity_scores {
            entry.popularity_score = arr.value(i).clamp(0.0, 1.0);
        }
        if let Some(ref arr) = rating_scores {
            entry.rating_score = arr.value(i).clamp(0.0, 1.0);
        }
        if let Some(ref arr) = interaction_counts {
            if !arr.is_null(i) {
                entry.interaction_count = Some(arr.value(i) as u64);
            }
        }
        if let Some(ref arr) = mean_ratings {
            if !arr.is_null(i) {
                entry.mean_rating = Some(arr.value(i));
            }
        }
    }

    Ok(())
}

fn backfill_from_raw_counts(table: &mut HashMap<ItemId, PopularityEntry>) {
    let max_interactions = table
        .values()
        .filter_map(|e| e.interaction_count)
        .max()
        .unwrap_or(0)
        .max(1) as f32;

    for entry in table.values_mut() {
        if entry.popularity_score == 0.0 {
            entry.popularity_score = entry
                .interaction_count
                .map(|c| ((c as f32).ln_1p() / max_interactions.ln_1p()).clamp(0.0, 1.0))
                .unwrap_or(0.0);
        }
        if entry.rating_score == 0.0 {
            entry.rating_score = entry
                .mean_rating
                .map(|r| ((r - 1.0) / 4.0).clamp(0.0, 1.0))
                .unwrap_or(0.0);
        }
    }
}

fn column_as_strings<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("missing required column `{name}`"))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow::anyhow!("column `{name}` is not a utf8 string array"))
}

fn column_as_f32<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Float32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("missing column `{name}`"))?
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| anyhow::anyhow!("column `{name}` is not float32"))
}

fn column_as_f32_opt<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Float32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
}

fn column_as_u64_opt<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
}
