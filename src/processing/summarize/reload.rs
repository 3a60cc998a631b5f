use super::{ReconstructedDocument, SourceReconstructionStrategy};
use crate::{
    completion::CompletionClient,
    config::RetrievalSettings,
    embedding::EmbeddingClient,
    processing::{
        chunking::TextSplitter,
        loader::{self, group_by_file},
        prompts::{SUMMARIZE_PROMPT, SUMMARIZE_QUERY},
        transient::TransientIndex,
        types::{
            DocumentMetadata, LoaderError, LogicalDocument, SummarizeError, SummaryMetadata,
            TransientIndexError,
        },
    },
    qdrant::payload::current_timestamp_rfc3339,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Re-reads the upload directory and summarizes each file through its own throwaway index.
pub struct ReloadStrategy {
    upload_dir: PathBuf,
    splitter: TextSplitter,
    embedding: Arc<dyn EmbeddingClient>,
    completion: Arc<dyn CompletionClient>,
    settings: RetrievalSettings,
}

impl ReloadStrategy {
    /// Build a strategy reading from `upload_dir`.
    pub fn new(
        upload_dir: PathBuf,
        splitter: TextSplitter,
        embedding: Arc<dyn EmbeddingClient>,
        completion: Arc<dyn CompletionClient>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            upload_dir,
            splitter,
            embedding,
            completion,
            settings,
        }
    }
}

#[async_trait]
impl SourceReconstructionStrategy for ReloadStrategy {
    fn name(&self) -> &'static str {
        "reload"
    }

    async fn reconstruct(&self) -> Result<Vec<ReconstructedDocument>, SummarizeError> {
        let documents = match loader::load_all(&self.upload_dir).await {
            Ok(documents) => documents,
            Err(LoaderError::NoDocumentsFound(_)) => return Err(SummarizeError::NoDocumentsFound),
            Err(error) => return Err(error.into()),
        };

        let grouped = group_by_file(documents);
        tracing::debug!(files = ?grouped.keys().collect::<Vec<_>>(), "Grouped pages by file");

        Ok(grouped
            .into_iter()
            .filter_map(|(base, pages)| combine_pages(base, &pages))
            .collect())
    }

    async fn summarize_document(
        &self,
        document: &ReconstructedDocument,
    ) -> Result<String, TransientIndexError> {
        let combined = LogicalDocument {
            id: document.doc_id.clone(),
            text: document.text.clone(),
            metadata: DocumentMetadata {
                file_name: document.source.clone(),
                page_label: None,
                page_count: document.metadata.page_count.unwrap_or(1),
            },
        };
        let index =
            TransientIndex::build(&combined, &self.splitter, self.embedding.clone()).await?;
        index
            .ask(
                self.completion.as_ref(),
                SUMMARIZE_PROMPT,
                SUMMARIZE_QUERY,
                self.settings.summary_context_chunks,
            )
            .await
    }
}

fn combine_pages(base: String, pages: &[LogicalDocument]) -> Option<ReconstructedDocument> {
    let first = pages.first()?;
    let texts: Vec<&str> = pages
        .iter()
        .map(|page| page.text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    if texts.is_empty() {
        tracing::debug!(file = %base, "No content to summarize");
        return None;
    }

    let content_length = texts.iter().map(|text| text.chars().count()).sum();
    let source = first.metadata.file_name.clone();
    Some(ReconstructedDocument {
        doc_id: base,
        text: texts.join("\n\n"),
        content_length,
        metadata: SummaryMetadata {
            file_name: Some(source.clone()),
            page_count: Some(first.metadata.page_count),
            chunk_count: None,
            processing_date: current_timestamp_rfc3339(),
        },
        source,
    })
}
