//! Vector index abstraction shared by the indexer, the query engine, and the summarizers.
//!
//! The service talks to a [`VectorStore`] rather than to Qdrant directly so the same pipeline
//! can run against the in-process [`InMemoryVectorStore`] (used for throwaway single-document
//! indexes and when `USE_QDRANT=false`).

mod memory;
mod qdrant;

pub use memory::InMemoryVectorStore;

use crate::qdrant::QdrantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by vector store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Qdrant request failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Operation targeted a collection that does not exist.
    #[error("collection '{0}' does not exist")]
    MissingCollection(String),
    /// Vector length does not match the collection's dimensionality.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed when the collection was created.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },
}

/// Source metadata carried by every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Original filename of the uploaded document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Free-form source label used when no filename is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 1-based page label within the source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
    /// Total page count of the source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

/// A retrievable chunk with its embedding, ready to be upserted.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique chunk identifier.
    pub id: String,
    /// Identifier of the logical document the chunk was cut from.
    pub ref_doc_id: String,
    /// Chunk text.
    pub text: String,
    /// Digest of the chunk text.
    pub chunk_hash: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Source metadata inherited from the logical document.
    pub metadata: NodeMetadata,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone)]
pub struct ScoredNode {
    /// Chunk identifier.
    pub id: String,
    /// Similarity to the query vector.
    pub score: f32,
    /// Chunk text.
    pub text: String,
    /// Identifier of the logical document the chunk was cut from, when recorded.
    pub ref_doc_id: Option<String>,
    /// Source metadata.
    pub metadata: NodeMetadata,
}

/// Where a chunk came from, resolved with a fixed precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRef<'a> {
    /// Original filename from metadata.
    FileName(&'a str),
    /// Free-form source label from metadata.
    Source(&'a str),
    /// Back-reference to the logical document.
    RefDoc(&'a str),
    /// Nothing usable was recorded.
    Unknown,
}

impl SourceRef<'_> {
    /// Identifier used to group chunks by source document.
    pub fn as_str(&self) -> &str {
        match self {
            SourceRef::FileName(value) | SourceRef::Source(value) | SourceRef::RefDoc(value) => {
                *value
            }
            SourceRef::Unknown => "unknown",
        }
    }
}

impl ScoredNode {
    /// Resolve the source document: `file_name`, then `source`, then `ref_doc_id`.
    pub fn source_ref(&self) -> SourceRef<'_> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        }

        if let Some(name) = non_empty(&self.metadata.file_name) {
            SourceRef::FileName(name)
        } else if let Some(source) = non_empty(&self.metadata.source) {
            SourceRef::Source(source)
        } else if let Some(doc) = non_empty(&self.ref_doc_id) {
            SourceRef::RefDoc(doc)
        } else {
            SourceRef::Unknown
        }
    }
}

/// Nearest-neighbour store holding named collections of [`Node`]s.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend label reported by document listings.
    fn backend(&self) -> &'static str;

    /// Create the collection with cosine distance unless it already exists.
    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<(), StoreError>;

    /// Delete the collection; deleting a missing collection succeeds.
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Insert or replace nodes, returning how many were written.
    async fn upsert(&self, name: &str, nodes: Vec<Node>) -> Result<usize, StoreError>;

    /// Return up to `limit` nodes ordered by descending similarity.
    async fn search(
        &self,
        name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredNode>, StoreError>;

    /// Number of vectors stored, or `0` when the collection does not exist.
    async fn count(&self, name: &str) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(metadata: NodeMetadata, ref_doc_id: Option<&str>) -> ScoredNode {
        ScoredNode {
            id: "n".into(),
            score: 1.0,
            text: "text".into(),
            ref_doc_id: ref_doc_id.map(str::to_string),
            metadata,
        }
    }

    #[test]
    fn source_ref_prefers_file_name() {
        let node = scored(
            NodeMetadata {
                file_name: Some("report.pdf".into()),
                source: Some("upload".into()),
                ..Default::default()
            },
            Some("doc-1"),
        );
        assert_eq!(node.source_ref(), SourceRef::FileName("report.pdf"));
    }

    #[test]
    fn source_ref_falls_back_in_order() {
        let node = scored(
            NodeMetadata {
                file_name: Some("  ".into()),
                source: Some("crawler".into()),
                ..Default::default()
            },
            Some("doc-1"),
        );
        assert_eq!(node.source_ref(), SourceRef::Source("crawler"));

        let node = scored(NodeMetadata::default(), Some("doc-1"));
        assert_eq!(node.source_ref(), SourceRef::RefDoc("doc-1"));

        let node = scored(NodeMetadata::default(), None);
        assert_eq!(node.source_ref(), SourceRef::Unknown);
        assert_eq!(node.source_ref().as_str(), "unknown");
    }
}
