use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `RECO__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub context_store: ContextStoreConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub ranker: RankerTunables,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_artifacts_dir")]
    pub dir: String,
    #[serde(default = "default_user_factors_file")]
    pub user_factors_file: String,
    #[serde(default = "default_item_factors_file")]
    pub item_factors_file: String,
    #[serde(default = "default_user_row_file")]
    pub user_row_file: String,
    #[serde(default = "default_row_item_file")]
    pub row_item_file: String,
    #[serde(default = "default_popularity_file")]
    pub popularity_file: String,
    #[serde(default = "default_ranker_file")]
    pub ranker_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextStoreConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_context_ttl_seconds")]
    pub context_ttl_seconds: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    #[serde(default = "default_vector_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub database_url: String,
    #[serde(default = "default_catalog_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_catalog_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Tunables governing recall sizing, normalization, and re-ranking
/// rules. See EXTERNAL INTERFACES for the meaning of each field.
#[derive(Debug, Clone, Deserialize)]
pub struct RankerTunables {
    #[serde(default = "default_k_latent")]
    pub k_latent: usize,
    #[serde(default = "default_k_pop")]
    pub k_pop: usize,
    #[serde(default = "default_k_content")]
    pub k_content: usize,
    #[serde(default = "default_top_n_rank")]
    pub top_n_rank: usize,
    #[serde(default = "default_top_n_final")]
    pub top_n_final: usize,
    #[serde(default = "default_content_boost_home")]
    pub content_boost_home: f32,
    #[serde(default = "default_content_boost_detail")]
    pub content_boost_detail: f32,
    #[serde(default = "default_normalization_method")]
    pub normalization_method: String,
    #[serde(default = "default_mf_weight")]
    pub mf_weight: f32,
    #[serde(default = "default_popularity_weight")]
    pub popularity_weight: f32,
    #[serde(default = "default_rating_weight")]
    pub rating_weight: f32,
    #[serde(default = "default_content_weight")]
    pub content_weight: f32,
    #[serde(default = "default_intent_boost_rate")]
    pub intent_boost_rate: f32,
    #[serde(default = "default_intent_boost_cap")]
    pub intent_boost_cap: f32,
    #[serde(default = "default_recency_threshold_top")]
    pub recency_threshold_top: usize,
    #[serde(default = "default_recency_threshold_mid")]
    pub recency_threshold_mid: usize,
    #[serde(default = "default_recency_multiplier_top")]
    pub recency_multiplier_top: f32,
    #[serde(default = "default_recency_multiplier_mid")]
    pub recency_multiplier_mid: f32,
    #[serde(default = "default_recency_multiplier_rest")]
    pub recency_multiplier_rest: f32,
    #[serde(default = "default_diversity_threshold")]
    pub diversity_threshold: f32,
    #[serde(default = "default_diversity_penalty")]
    pub diversity_penalty: f32,
    #[serde(default = "default_max_same_category")]
    pub max_same_category: usize,
    #[serde(default = "default_category_limit_penalty")]
    pub category_limit_penalty: f32,
    #[serde(default = "default_low_review_threshold")]
    pub low_review_threshold: u32,
    #[serde(default = "default_low_review_penalty")]
    pub low_review_penalty: f32,
}

// Default functions

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_artifacts_dir() -> String {
    "/var/lib/reco/artifacts".to_string()
}
fn default_user_factors_file() -> String {
    "user_factors.bin".to_string()
}
fn default_item_factors_file() -> String {
    "item_factors.bin".to_string()
}
fn default_user_row_file() -> String {
    "user_row.json".to_string()
}
fn default_row_item_file() -> String {
    "row_item.json".to_string()
}
fn default_popularity_file() -> String {
    "popularity.parquet".to_string()
}
fn default_ranker_file() -> String {
    "ranker.bin".to_string()
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_pool_size() -> u32 {
    32
}
fn default_context_ttl_seconds() -> u64 {
    900
}
fn default_connect_timeout_ms() -> u64 {
    2000
}
fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}
fn default_collection_name() -> String {
    "item_embeddings".to_string()
}
fn default_vector_timeout_ms() -> u64 {
    300
}
fn default_catalog_url() -> String {
    "postgres://localhost:5432/reco".to_string()
}
fn default_catalog_pool_size() -> u32 {
    16
}
fn default_catalog_timeout_ms() -> u64 {
    500
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_k_latent() -> usize {
    100
}
fn default_k_pop() -> usize {
    50
}
fn default_k_content() -> usize {
    50
}
fn default_top_n_rank() -> usize {
    50
}
fn default_top_n_final() -> usize {
    20
}
fn default_content_boost_home() -> f32 {
    1.0
}
fn default_content_boost_detail() -> f32 {
    2.5
}
fn default_normalization_method() -> String {
    "min_max".to_string()
}
fn default_mf_weight() -> f32 {
    1.0
}
fn default_popularity_weight() -> f32 {
    0.8
}
fn default_rating_weight() -> f32 {
    1.0
}
fn default_content_weight() -> f32 {
    1.0
}
fn default_intent_boost_rate() -> f32 {
    0.08
}
fn default_intent_boost_cap() -> f32 {
    0.40
}
fn default_recency_threshold_top() -> usize {
    5
}
fn default_recency_threshold_mid() -> usize {
    10
}
fn default_recency_multiplier_top() -> f32 {
    0.2
}
fn default_recency_multiplier_mid() -> f32 {
    0.4
}
fn default_recency_multiplier_rest() -> f32 {
    0.6
}
fn default_diversity_threshold() -> f32 {
    0.25
}
fn default_diversity_penalty() -> f32 {
    0.7
}
fn default_max_same_category() -> usize {
    4
}
fn default_category_limit_penalty() -> f32 {
    0.5
}
fn default_low_review_threshold() -> u32 {
    5
}
fn default_low_review_penalty() -> f32 {
    0.9
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            user_factors_file: default_user_factors_file(),
            item_factors_file: default_item_factors_file(),
            user_row_file: default_user_row_file(),
            row_item_file: default_row_item_file(),
            popularity_file: default_popularity_file(),
            ranker_file: default_ranker_file(),
        }
    }
}

impl Default for ContextStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            context_ttl_seconds: default_context_ttl_seconds(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection_name: default_collection_name(),
            timeout_ms: default_vector_timeout_ms(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: default_catalog_url(),
            pool_size: default_catalog_pool_size(),
            timeout_ms: default_catalog_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for RankerTunables {
    fn default() -> Self {
        Self {
            k_latent: default_k_latent(),
            k_pop: default_k_pop(),
            k_content: default_k_content(),
            top_n_rank: default_top_n_rank(),
            top_n_final: default_top_n_final(),
            content_boost_home: default_content_boost_home(),
            content_boost_detail: default_content_boost_detail(),
            normalization_method: default_normalization_method(),
            mf_weight: default_mf_weight(),
            popularity_weight: default_popularity_weight(),
            rating_weight: default_rating_weight(),
            content_weight: default_content_weight(),
            intent_boost_rate: default_intent_boost_rate(),
            intent_boost_cap: default_intent_boost_cap(),
            recency_threshold_top: default_recency_threshold_top(),
            recency_threshold_mid: default_recency_threshold_mid(),
            recency_multiplier_top: default_recency_multiplier_top(),
            recency_multiplier_mid: default_recency_multiplier_mid(),
            recency_multiplier_rest: default_recency_multiplier_rest(),
            diversity_threshold: default_diversity_threshold(),
            diversity_penalty: default_diversity_penalty(),
            max_same_category: default_max_same_category(),
            category_limit_penalty: default_category_limit_penalty(),
            low_review_threshold: default_low_review_threshold(),
            low_review_penalty: default_low_review_penalty(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            artifacts: ArtifactsConfig::default(),
            context_store: ContextStoreConfig::default(),
            vector_index: VectorIndexConfig::default(),
            catalog: CatalogConfig::default(),
            metrics: MetricsConfig::default(),
            ranker: RankerTunables::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables (prefix `RECO__`,
    /// `__` as the nesting separator) layered over the built-in
    /// defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("RECO")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
