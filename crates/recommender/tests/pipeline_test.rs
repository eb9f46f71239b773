//! End-to-end exercise of the recall -> feature assembly -> rank ->
//! re-rank -> catalog-join pipeline, and of the event fast-path that
//! feeds it short-term context, against in-memory/fixture-backed
//! doubles for every external dependency.

use arrow::array::{Float32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use reco_artifact_loader::ArtifactLoader;
use reco_catalog_client::{CatalogClient, InMemoryCatalog};
use reco_context_store::{ContextStore, InMemoryContextStore};
use reco_core::config::{ArtifactsConfig, RankerTunables};
use reco_core::event_bus::CaptureSink;
use reco_core::types::{CatalogItem, EventKind, InteractionEvent, FEATURE_ORDER};
use reco_recommender::{EventFastPath, Orchestrator, RecommendationMode, RecommendationRequest};
use reco_vector_index::InMemoryVectorIndex;
use std::path::Path;
use std::sync::Arc;

const ITEMS: [&str; 6] = ["I1", "I2", "I3", "I4", "I5", "I6"];

fn write_matrix(path: &Path, rows: u64, cols: u64, data: &[f32]) {
    use std::io::Write;
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(&rows.to_le_bytes()).unwrap();
    file.write_all(&cols.to_le_bytes()).unwrap();
    for v in data {
        file.write_all(&v.to_le_bytes()).unwrap();
    }
}

fn write_ranker(path: &Path) {
    let weights = reco_artifact_loader::RankerWeights {
        w: [1.0, 1.0, 1.0, 1.0],
        intercept: 0.0,
        feature_order: FEATURE_ORDER.map(|s| s.to_string()),
    };
    std::fs::write(path, bincode::serialize(&weights).unwrap()).unwrap();
}

fn write_popularity(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("item_id", DataType::Utf8, false),
        Field::new("popularity_score", DataType::Float32, false),
        Field::new("rating_score", DataType::Float32, false),
        Field::new("interaction_count", DataType::Int64, true),
        Field::new("mean_rating", DataType::Float32, true),
    ]));

    let item_ids = StringArray::from(ITEMS.to_vec());
    // I1 is the standout popular/highly-rated item; the rest decay.
    let popularity_scores = Float32Array::from(vec![0.95_f32, 0.40, 0.30, 0.20, 0.10, 0.05]);
    let rating_scores = Float32Array::from(vec![0.9_f32, 0.6, 0.5, 0.4, 0.3, 0.2]);
    let interaction_counts = Int64Array::from(vec![5000_i64, 800, 400, 200, 100, 10]);
    let mean_ratings = Float32Array::from(vec![4.8_f32, 4.0, 3.8, 3.5, 3.2, 2.5]);

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(item_ids),
            Arc::new(popularity_scores),
            Arc::new(rating_scores),
            Arc::new(interaction_counts),
            Arc::new(mean_ratings),
        ],
    )
    .unwrap();

    let file = std::fs::File::create(path).unwrap();
    let mut writer = parquet::arrow::ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn build_artifacts(dir: &Path) -> ArtifactLoader {
    std::fs::create_dir_all(dir).unwrap();

    // u1 aligns with I1 (latent dim 0); u2 aligns with I2 (latent dim 1).
    write_matrix(&dir.join("user_factors.bin"), 2, 2, &[1.0, 0.0, 0.0, 1.0]);
    write_matrix(
        &dir.join("item_factors.bin"),
        6,
        2,
        &[
            1.0, 0.0, // I1
            0.0, 1.0, // I2
            0.5, 0.5, // I3
            0.2, 0.2, // I4
            0.1, 0.1, // I5
            0.0, 0.0, // I6
        ],
    );
    std::fs::write(
        dir.join("user_row.json"),
        serde_json::json!({"u1": 0, "u2": 1}).to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.join("row_item.json"),
        serde_json::json!({"0": "I1", "1": "I2", "2": "I3", "3": "I4", "4": "I5", "5": "I6"})
            .to_string(),
    )
    .unwrap();
    write_popularity(&dir.join("popularity.parquet"));
    write_ranker(&dir.join("ranker.bin"));

    let config = ArtifactsConfig {
        dir: dir.to_string_lossy().to_string(),
        user_factors_file: "user_factors.bin".into(),
        item_factors_file: "item_factors.bin".into(),
        user_row_file: "user_row.json".into(),
        row_item_file: "row_item.json".into(),
        popularity_file: "popularity.parquet".into(),
        ranker_file: "ranker.bin".into(),
    };

    ArtifactLoader::load(&config).expect("fixture artifacts should load")
}

fn catalog_item(id: &str, family: &str, category: &str, rating_count: u32) -> CatalogItem {
    CatalogItem {
        item_id: id.to_string(),
        family_id: family.to_string(),
        title: format!("{id} title"),
        category: Some(category.to_string()),
        brand: Some("Acme".to_string()),
        avg_rating: Some(4.0),
        rating_count: Some(rating_count),
        image_url: Some(format!("https://example.test/{id}.jpg")),
    }
}

fn build_catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog.insert(catalog_item("I1", "F1", "Electronics", 5000));
    catalog.insert(catalog_item("I2", "F2", "Books", 800));
    catalog.insert(catalog_item("I3", "F3", "Electronics", 400));
    catalog.insert(catalog_item("I4", "F4", "Home", 200));
    catalog.insert(catalog_item("I5", "F5", "Home", 100));
    catalog.insert(catalog_item("I6", "F6", "Toys", 2));
    catalog
}

fn build_vector_index() -> InMemoryVectorIndex {
    let mut index = InMemoryVectorIndex::new();
    index.insert("I1", vec![1.0, 0.0]);
    index.insert("I2", vec![0.0, 1.0]);
    index.insert("I3", vec![0.5, 0.5]);
    index.insert("I4", vec![0.2, 0.2]);
    index.insert("I5", vec![0.1, 0.1]);
    index.insert("I6", vec![0.0, 0.0]);
    index
}

fn tmp_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("reco-pipeline-test-{tag}-{}", std::process::id()))
}

#[tokio::test]
async fn homepage_recommend_returns_ranked_and_joined_results() {
    let dir = tmp_dir("homepage");
    let loader = Arc::new(build_artifacts(&dir));
    let vector_index = Arc::new(build_vector_index());
    let catalog = Arc::new(build_catalog());
    let context_store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::default());

    let mut tunables = RankerTunables::default();
    tunables.k_latent = 6;
    tunables.k_pop = 6;
    tunables.k_content = 6;
    tunables.top_n_rank = 6;
    tunables.top_n_final = 4;

    let orchestrator = Orchestrator::new(
        loader,
        vector_index,
        catalog.clone(),
        context_store,
        tunables,
    );

    let request = RecommendationRequest {
        user_id: Some("u1".to_string()),
        mode: RecommendationMode::Homepage {
            references: Vec::new(),
        },
        recent_exclusions: Vec::new(),
    };

    let recommendations = orchestrator.recommend(&request).await.unwrap();

    assert!(!recommendations.is_empty());
    assert!(recommendations.len() <= 4);
    // rank_position is contiguous starting at 1.
    for (i, rec) in recommendations.iter().enumerate() {
        assert_eq!(rec.rank_position, i + 1);
        assert!(rec.title.is_some());
    }
    // Scores are non-increasing.
    for pair in recommendations.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // No two recommendations share a family id (dedup held).
    let mut families = std::collections::HashSet::new();
    for rec in &recommendations {
        let item = catalog_item_lookup(&catalog, &rec.item_id).await;
        assert!(families.insert(item.family_id));
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn product_detail_recommend_excludes_the_anchor_item() {
    let dir = tmp_dir("detail");
    let loader = Arc::new(build_artifacts(&dir));
    let vector_index = Arc::new(build_vector_index());
    let catalog = Arc::new(build_catalog());
    let context_store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::default());

    let mut tunables = RankerTunables::default();
    tunables.k_latent = 6;
    tunables.k_pop = 6;
    tunables.k_content = 6;
    tunables.top_n_rank = 6;
    tunables.top_n_final = 5;

    let orchestrator = Orchestrator::new(loader, vector_index, catalog, context_store, tunables);

    let request = RecommendationRequest {
        user_id: None,
        mode: RecommendationMode::ProductDetail {
            anchor: "I1".to_string(),
        },
        recent_exclusions: Vec::new(),
    };

    let recommendations = orchestrator.recommend(&request).await.unwrap();

    assert!(recommendations.iter().all(|rec| rec.item_id != "I1"));
}

#[tokio::test]
async fn event_fast_path_commits_context_before_next_recommend_call() {
    let dir = tmp_dir("events");
    let loader = Arc::new(build_artifacts(&dir));
    let vector_index = Arc::new(build_vector_index());
    let catalog = Arc::new(build_catalog());
    let context_store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::default());
    let sink = Arc::new(CaptureSink::default());

    let fast_path = EventFastPath::new(context_store.clone(), catalog.clone(), sink.clone());

    fast_path
        .record(InteractionEvent {
            user_id: "u1".to_string(),
            item_id: "I1".to_string(),
            event_kind: EventKind::Purchase,
            ts: chrono::Utc::now(),
            metadata: serde_json::json!({}),
        })
        .await;

    assert_eq!(sink.count(), 1);

    let tunables = RankerTunables::default();
    let orchestrator = Orchestrator::new(loader, vector_index, catalog, context_store, tunables);

    let request = RecommendationRequest {
        user_id: Some("u1".to_string()),
        mode: RecommendationMode::Homepage {
            references: vec!["I1".to_string()],
        },
        recent_exclusions: Vec::new(),
    };

    let recommendations = orchestrator.recommend(&request).await.unwrap();

    // I1's recorded category (Electronics) should have earned any
    // same-category item in the result set an intent-boost tag.
    let electronics_boosted = recommendations.iter().any(|rec| {
        rec.category.as_deref() == Some("Electronics")
            && rec.applied_rules.iter().any(|rule| rule.starts_with("intent_boost"))
    });
    assert!(electronics_boosted || recommendations.is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

async fn catalog_item_lookup(catalog: &InMemoryCatalog, item_id: &str) -> CatalogItem {
    catalog.get_item(&item_id.to_string()).await.unwrap()
}
