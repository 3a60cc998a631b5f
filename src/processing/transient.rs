//! Throwaway single-document index.
//!
//! Each instance owns a private in-memory store, so nothing leaks between documents or into
//! the main collection. Used to summarize one reloaded file and to analyze combined summaries.

use super::{
    chunking::TextSplitter,
    mappers::{dedupe_chunks, node_from_chunk},
    prompts,
    types::{LogicalDocument, TransientIndexError},
};
use crate::{
    completion::CompletionClient,
    embedding::EmbeddingClient,
    store::{InMemoryVectorStore, ScoredNode, VectorStore},
};
use std::sync::Arc;

const COLLECTION: &str = "transient";

/// Private index over a single synthetic document.
pub(crate) struct TransientIndex {
    store: InMemoryVectorStore,
    embedding: Arc<dyn EmbeddingClient>,
}

impl TransientIndex {
    /// Chunk and embed `document` into a fresh in-memory store.
    pub(crate) async fn build(
        document: &LogicalDocument,
        splitter: &TextSplitter,
        embedding: Arc<dyn EmbeddingClient>,
    ) -> Result<Self, TransientIndexError> {
        let (chunks, _) = dedupe_chunks(splitter.split(&document.text));
        if chunks.is_empty() {
            return Err(TransientIndexError::NoChunks);
        }

        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embedding.generate_embeddings(texts).await?;
        let nodes = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| node_from_chunk(document, chunk, vector))
            .collect();

        let store = InMemoryVectorStore::new();
        store
            .ensure_collection(COLLECTION, embedding.dimension())
            .await?;
        store.upsert(COLLECTION, nodes).await?;
        Ok(Self { store, embedding })
    }

    /// Top `limit` chunks most similar to `question`.
    pub(crate) async fn retrieve(
        &self,
        question: &str,
        limit: usize,
    ) -> Result<Vec<ScoredNode>, TransientIndexError> {
        let vector = self.embedding.embed_query(question).await?;
        Ok(self.store.search(COLLECTION, vector, limit).await?)
    }

    /// Retrieve context for `question` and ask the model to answer it with `template`.
    pub(crate) async fn ask(
        &self,
        completion: &dyn CompletionClient,
        template: &str,
        question: &str,
        limit: usize,
    ) -> Result<String, TransientIndexError> {
        let context = join_context(&self.retrieve(question, limit).await?);
        let prompt = prompts::render(template, &context, question);
        Ok(completion.complete(&prompt).await?)
    }
}

/// Join retrieved chunk texts into a single context block.
pub(crate) fn join_context(nodes: &[ScoredNode]) -> String {
    nodes
        .iter()
        .map(|node| node.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}
