//! Chunk, embed, and upsert logical documents into the main collection.

use super::{
    chunking::TextSplitter,
    mappers::{dedupe_chunks, node_from_chunk},
    snapshot::{IndexSnapshot, SnapshotEntry},
    types::{IndexOutcome, IndexingError, LogicalDocument},
};
use crate::{
    embedding::EmbeddingClient,
    qdrant::payload::current_timestamp_rfc3339,
    store::{Node, VectorStore},
};
use std::path::PathBuf;
use std::sync::Arc;

/// Writes logical documents into the named collection and records them in the snapshot.
pub struct Indexer {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    collection: String,
    persist_dir: PathBuf,
}

impl Indexer {
    /// Build an indexer writing to `collection` and persisting metadata under `persist_dir`.
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        splitter: TextSplitter,
        collection: String,
        persist_dir: PathBuf,
    ) -> Self {
        Self {
            embedding,
            store,
            splitter,
            collection,
            persist_dir,
        }
    }

    /// Chunk, embed, and upsert `documents`, then persist the index snapshot.
    ///
    /// Chunks of every document are embedded in one batch; any failure fails the whole call.
    pub async fn index_documents(
        &self,
        documents: &[LogicalDocument],
    ) -> Result<IndexOutcome, IndexingError> {
        self.store
            .ensure_collection(&self.collection, self.embedding.dimension())
            .await?;

        let mut prepared = Vec::new();
        let mut skipped_duplicates = 0;
        for (position, document) in documents.iter().enumerate() {
            let (chunks, skipped) = dedupe_chunks(self.splitter.split(&document.text));
            skipped_duplicates += skipped;
            prepared.extend(chunks.into_iter().map(|chunk| (position, chunk)));
        }

        if prepared.is_empty() {
            tracing::warn!(
                documents = documents.len(),
                "Documents produced no chunks; nothing to index"
            );
            return Ok(IndexOutcome {
                documents: documents.len(),
                chunk_size: self.splitter.chunk_size(),
                ..IndexOutcome::default()
            });
        }

        let texts = prepared.iter().map(|(_, chunk)| chunk.text.clone()).collect();
        let vectors = self.embedding.generate_embeddings(texts).await?;
        debug_assert_eq!(prepared.len(), vectors.len());

        let nodes: Vec<Node> = prepared
            .into_iter()
            .zip(vectors)
            .map(|((position, chunk), vector)| node_from_chunk(&documents[position], chunk, vector))
            .collect();

        let entries = snapshot_entries(documents, &nodes);
        let written = self.store.upsert(&self.collection, nodes).await?;
        IndexSnapshot::record(
            &self.persist_dir,
            &self.collection,
            current_timestamp_rfc3339(),
            entries,
        )
        .await?;

        tracing::info!(
            collection = %self.collection,
            backend = self.store.backend(),
            documents = documents.len(),
            chunks = written,
            skipped_duplicates,
            chunk_size = self.splitter.chunk_size(),
            "Documents indexed"
        );

        Ok(IndexOutcome {
            documents: documents.len(),
            chunks: written,
            skipped_duplicates,
            chunk_size: self.splitter.chunk_size(),
        })
    }
}

fn snapshot_entries(documents: &[LogicalDocument], nodes: &[Node]) -> Vec<SnapshotEntry> {
    documents
        .iter()
        .filter_map(|document| {
            let node_ids: Vec<String> = nodes
                .iter()
                .filter(|node| node.ref_doc_id == document.id)
                .map(|node| node.id.clone())
                .collect();
            (!node_ids.is_empty()).then(|| SnapshotEntry {
                doc_id: document.id.clone(),
                file_name: document.metadata.file_name.clone(),
                page_label: document.metadata.page_label.clone(),
                node_ids,
            })
        })
        .collect()
}
