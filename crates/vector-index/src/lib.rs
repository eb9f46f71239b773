#![warn(clippy::unwrap_used)]

pub mod client;
pub mod point_id;

pub use client::{InMemoryVectorIndex, QdrantVectorIndex, VectorIndex};
pub use point_id::item_id_to_point_id;
