use super::{ReconstructedDocument, SourceReconstructionStrategy};
use crate::{
    completion::CompletionClient,
    config::RetrievalSettings,
    embedding::EmbeddingClient,
    processing::{
        prompts::{self, RECONSTRUCTION_PROBES, SUMMARIZE_PROMPT},
        types::{SummarizeError, SummaryMetadata, TransientIndexError},
    },
    qdrant::payload::current_timestamp_rfc3339,
    store::{ScoredNode, SourceRef, VectorStore},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const MIN_CONTENT_CHARS: usize = 50;
const MAX_CONTEXT_CHARS: usize = 3000;

/// Rebuilds documents from chunks surfaced by broad probe queries against the main collection.
///
/// Coverage depends on what the probes retrieve, so large indexes may be summarized partially.
pub struct VectorStrategy {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    completion: Arc<dyn CompletionClient>,
    collection: String,
    settings: RetrievalSettings,
}

impl VectorStrategy {
    /// Build a strategy probing `collection`.
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

    async fn probe(&self) -> Result<Vec<ScoredNode>, SummarizeError> {
        let probes: Vec<String> = RECONSTRUCTION_PROBES.iter().map(|p| p.to_string()).collect();
        let vectors = self.embedding.generate_embeddings(probes).await?;

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for vector in vectors {
            let hits = self
                .store
                .search(&self.collection, vector, self.settings.reconstruction_top_k)
                .await?;
            nodes.extend(hits.into_iter().filter(|hit| seen.insert(hit.id.clone())));
        }
        Ok(nodes)
    }
}

#[async_trait]
impl SourceReconstructionStrategy for VectorStrategy {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn reconstruct(&self) -> Result<Vec<ReconstructedDocument>, SummarizeError> {
        if self.store.count(&self.collection).await? == 0 {
            return Err(SummarizeError::NoDocumentsFound);
        }
        let nodes = self.probe().await?;
        if nodes.is_empty() {
            return Err(SummarizeError::NoDocumentsFound);
        }
        tracing::debug!(nodes = nodes.len(), "Probed chunks from the index");
        Ok(group_by_source(nodes))
    }

    async fn summarize_document(
        &self,
        document: &ReconstructedDocument,
    ) -> Result<String, TransientIndexError> {
        let context: String = document.text.chars().take(MAX_CONTEXT_CHARS).collect();
        let query = prompts::reconstructed_summary_query(&document.source);
        let prompt = prompts::render(SUMMARIZE_PROMPT, &context, &query);
        Ok(self.completion.complete(&prompt).await?)
    }
}

/// Group chunks by resolved source, in first-seen order, ordering each group by page.
///
/// Groups whose joined text is shorter than 50 characters are dropped as noise.
fn group_by_source(nodes: Vec<ScoredNode>) -> Vec<ReconstructedDocument> {
    let mut order: Vec<(String, bool)> = Vec::new();
    let mut groups: HashMap<String, Vec<ScoredNode>> = HashMap::new();
    for node in nodes {
        let source_ref = node.source_ref();
        let key = source_ref.as_str().to_string();
        if !groups.contains_key(&key) {
            order.push((key.clone(), matches!(source_ref, SourceRef::FileName(_))));
        }
        groups.entry(key).or_default().push(node);
    }

    order
        .into_iter()
        .filter_map(|(source, is_file)| {
            let mut chunks = groups.remove(&source)?;
            chunks.sort_by_key(|chunk| page_number(chunk).unwrap_or(u32::MAX));
            let text = chunks
                .iter()
                .map(|chunk| chunk.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            if text.trim().chars().count() < MIN_CONTENT_CHARS {
                tracing::debug!(source = %source, "Skipping near-empty source");
                return None;
            }
            Some(ReconstructedDocument {
                doc_id: source.clone(),
                content_length: text.chars().count(),
                text,
                metadata: SummaryMetadata {
                    file_name: is_file.then(|| source.clone()),
                    page_count: chunks.iter().find_map(|chunk| chunk.metadata.page_count),
                    chunk_count: Some(chunks.len()),
                    processing_date: current_timestamp_rfc3339(),
                },
                source,
            })
        })
        .collect()
}

fn page_number(node: &ScoredNode) -> Option<u32> {
    node.metadata.page_label.as_deref()?.parse().ok()
}
