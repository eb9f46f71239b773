#![warn(clippy::unwrap_used)]

pub mod factors;
pub mod loader;
pub mod popularity;
pub mod ranker_weights;

pub use loader::ArtifactLoader;
pub use popularity::PopularityEntry;
pub use ranker_weights::RankerWeights;
