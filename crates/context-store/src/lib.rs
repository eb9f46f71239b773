#![warn(clippy::unwrap_used)]

pub mod client;

pub use client::{ContextStore, ContextStoreClient, InMemoryContextStore};
