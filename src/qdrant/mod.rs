//! Qdrant vector store integration over the REST API.

pub mod client;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use payload::compute_chunk_hash;
pub use types::{CollectionStats, PointInsert, QdrantError, ScoredPoint};
