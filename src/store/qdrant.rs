//! [`VectorStore`] implementation backed by the Qdrant REST client.

use async_trait::async_trait;

use super::{Node, ScoredNode, StoreError, VectorStore};
use crate::qdrant::QdrantService;
use crate::qdrant::payload::{build_point, current_timestamp_rfc3339, scored_node_from_point};

#[async_trait]
impl VectorStore for QdrantService {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<(), StoreError> {
        self.create_collection_if_not_exists(name, dimension as u64)
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        QdrantService::delete_collection(self, name).await?;
        Ok(())
    }

    async fn upsert(&self, name: &str, nodes: Vec<Node>) -> Result<usize, StoreError> {
        let timestamp = current_timestamp_rfc3339();
        let points = nodes
            .into_iter()
            .map(|node| build_point(node, &timestamp))
            .collect();
        Ok(self.upsert_points(name, points).await?)
    }

    async fn search(
        &self,
        name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredNode>, StoreError> {
        let points = self.search_points(name, vector, limit).await?;
        Ok(points.into_iter().map(scored_node_from_point).collect())
    }

    async fn count(&self, name: &str) -> Result<u64, StoreError> {
        Ok(self
            .collection_stats(name)
            .await?
            .map(|stats| stats.points_count)
            .unwrap_or(0))
    }
}
