use thiserror::Error;

pub type RecoResult<T> = Result<T, RecoError>;

#[derive(Error, Debug)]
pub enum RecoError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad or missing artifact at startup. Fatal at startup only —
    /// soft failures (an id simply absent from a loaded artifact) are
    /// not represented as this variant, see ArtifactMissing handling
    /// in the artifact-loader accessors, which return Option instead.
    #[error("artifact loader error: {0}")]
    Loader(String),

    #[error("context store unavailable: {0}")]
    ContextStore(String),

    #[error("vector index unavailable: {0}")]
    VectorIndex(String),

    #[error("catalog unavailable: {0}")]
    Catalog(String),

    #[error("ranker inference error: {0}")]
    Ranker(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
