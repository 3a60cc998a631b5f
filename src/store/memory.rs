//! In-process vector store using cosine similarity.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Node, ScoredNode, StoreError, VectorStore};

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    // Insertion order is kept so equal scores come back in a stable order.
    nodes: Vec<Node>,
}

/// Vector store backed by a `HashMap` of collections behind a `tokio::sync::RwLock`.
///
/// Used for throwaway single-document indexes and as the main index when Qdrant is disabled.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity; `0.0` when either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                dimension,
                nodes: Vec::new(),
            });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn upsert(&self, name: &str, nodes: Vec<Node>) -> Result<usize, StoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| StoreError::MissingCollection(name.to_string()))?;

        if let Some(bad) = nodes
            .iter()
            .find(|node| node.vector.len() != collection.dimension)
        {
            return Err(StoreError::DimensionMismatch {
                expected: collection.dimension,
                actual: bad.vector.len(),
            });
        }

        let written = nodes.len();
        for node in nodes {
            match collection
                .nodes
                .iter_mut()
                .find(|existing| existing.id == node.id)
            {
                Some(existing) => *existing = node,
                None => collection.nodes.push(node),
            }
        }
        Ok(written)
    }

    async fn search(
        &self,
        name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredNode>, StoreError> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::MissingCollection(name.to_string()))?;

        let mut scored: Vec<ScoredNode> = collection
            .nodes
            .iter()
            .map(|node| ScoredNode {
                id: node.id.clone(),
                score: cosine_similarity(&node.vector, &vector),
                text: node.text.clone(),
                ref_doc_id: Some(node.ref_doc_id.clone()),
                metadata: node.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self, name: &str) -> Result<u64, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(|collection| collection.nodes.len() as u64)
            .unwrap_or(0))
    }
}
