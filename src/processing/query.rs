//! Grounded question answering over the main collection.

use super::{
    mappers::source_from_node,
    prompts::{self, NO_RELEVANT_INFORMATION, QA_PROMPT},
    transient::join_context,
    types::{QueryAnswer, QueryError},
};
use crate::{
    completion::CompletionClient, config::RetrievalSettings, embedding::EmbeddingClient,
    store::VectorStore,
};
use std::sync::Arc;

/// Retrieves nearest chunks, applies the relevance gate, and synthesizes an answer.
pub struct QueryEngine {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    completion: Arc<dyn CompletionClient>,
    collection: String,
    settings: RetrievalSettings,
}

impl QueryEngine {
    /// Build a query engine over `collection`.
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        completion: Arc<dyn CompletionClient>,
        collection: String,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedding,
            store,
            completion,
            collection,
            settings,
        }
    }

    /// Answer `question` from chunks scoring at least the similarity threshold.
    ///
    /// The language model is only called when at least one chunk clears the threshold; an
    /// empty collection fails with [`QueryError::EmptyIndex`] before any provider call.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        if self.store.count(&self.collection).await? == 0 {
            return Err(QueryError::EmptyIndex);
        }

        let vector = self.embedding.embed_query(question).await?;
        let candidates = self
            .store
            .search(&self.collection, vector, self.settings.query_top_k)
            .await?;
        let retrieved = candidates.len();
        let threshold = self.settings.similarity_threshold;
        let relevant: Vec<_> = candidates
            .into_iter()
            .filter(|node| node.score >= threshold)
            .collect();

        tracing::debug!(
            collection = %self.collection,
            retrieved,
            relevant = relevant.len(),
            threshold,
            "Retrieved candidate chunks"
        );

        if relevant.is_empty() {
            return Ok(QueryAnswer {
                answer: NO_RELEVANT_INFORMATION.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = prompts::render(QA_PROMPT, &join_context(&relevant), question);
        let answer = self.completion.complete(&prompt).await?;
        tracing::info!(sources = relevant.len(), "Answer synthesized");

        Ok(QueryAnswer {
            answer,
            sources: relevant.iter().map(source_from_node).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingClientError;
    use crate::processing::test_support::RecordingCompletion;
    use crate::store::{InMemoryVectorStore, Node, NodeMetadata};
    use async_trait::async_trait;

    const COLLECTION: &str = "qa";

    /// Embeds every text as the first axis of a 2-d space.
    struct AxisEmbedding;

    #[async_trait]
    impl EmbeddingClient for AxisEmbedding {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn node(id: &str, text: &str, vector: Vec<f32>) -> Node {
        Node {
            id: id.to_string(),
            ref_doc_id: format!("doc-{id}"),
            text: text.to_string(),
            chunk_hash: id.to_string(),
            vector,
            metadata: NodeMetadata::default(),
        }
    }

    async fn engine(nodes: Vec<Node>) -> (QueryEngine, Arc<RecordingCompletion>) {
        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection(COLLECTION, 2).await.expect("collection");
        store.upsert(COLLECTION, nodes).await.expect("upsert");
        let completion = Arc::new(RecordingCompletion::new("grounded answer"));
        let engine = QueryEngine::new(
            Arc::new(AxisEmbedding),
            store,
            completion.clone(),
            COLLECTION.to_string(),
            RetrievalSettings::default(),
        );
        (engine, completion)
    }

    #[tokio::test]
    async fn only_chunks_at_or_above_threshold_reach_the_prompt() {
        let (engine, completion) = engine(vec![
            node("low", "orthogonal chunk", vec![0.0, 1.0]),
            node("edge", "boundary chunk", vec![4.0, 3.0]),
            node("high", "exact chunk", vec![1.0, 0.0]),
        ])
        .await;

        let answer = engine.answer("question").await.expect("answer");

        assert_eq!(answer.answer, "grounded answer");
        let ids: Vec<_> = answer
            .sources
            .iter()
            .map(|source| source.doc_id.as_deref())
            .collect();
        assert_eq!(ids, vec![Some("doc-high"), Some("doc-edge")]);
        assert!((answer.sources[1].score - 0.8).abs() < f32::EPSILON);

        assert_eq!(completion.calls(), 1);
        let prompt = &completion.prompts()[0];
        assert!(prompt.contains("exact chunk"));
        assert!(prompt.contains("boundary chunk"));
        assert!(!prompt.contains("orthogonal chunk"));
    }

    #[tokio::test]
    async fn nothing_above_threshold_skips_the_llm() {
        let (engine, completion) =
            engine(vec![node("low", "orthogonal chunk", vec![0.0, 1.0])]).await;

        let answer = engine.answer("question").await.expect("answer");
        assert_eq!(answer.answer, NO_RELEVANT_INFORMATION);
        assert!(answer.sources.is_empty());
        assert_eq!(completion.calls(), 0);
    }
}
