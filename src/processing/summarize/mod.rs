//! Per-document summarization.
//!
//! A [`SourceReconstructionStrategy`] rebuilds the full text of every source document and
//! summarizes one document at a time. [`summarize_all`] drives a strategy, skipping documents
//! that fail and failing only when nothing could be summarized.

mod reload;
mod vector;

pub use reload::ReloadStrategy;
pub use vector::VectorStrategy;

use super::types::{SummarizeError, SummaryMetadata, SummaryRecord, TransientIndexError};
use async_trait::async_trait;

/// Full text of one source document, rebuilt for summarization.
#[derive(Debug, Clone)]
pub struct ReconstructedDocument {
    /// Identifier reported with the summary.
    pub doc_id: String,
    /// Human-readable source identifier.
    pub source: String,
    /// Text handed to the summarizer.
    pub text: String,
    /// Character count of the rebuilt text.
    pub content_length: usize,
    /// Provenance reported with the summary.
    pub metadata: SummaryMetadata,
}

/// How source documents are rebuilt and summarized.
#[async_trait]
pub trait SourceReconstructionStrategy: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Rebuild every source document.
    ///
    /// Fails with [`SummarizeError::NoDocumentsFound`] when there is nothing to rebuild.
    async fn reconstruct(&self) -> Result<Vec<ReconstructedDocument>, SummarizeError>;

    /// Produce the summary text for one rebuilt document.
    async fn summarize_document(
        &self,
        document: &ReconstructedDocument,
    ) -> Result<String, TransientIndexError>;
}

/// Summarize every document the strategy rebuilds.
pub async fn summarize_all(
    strategy: &dyn SourceReconstructionStrategy,
) -> Result<Vec<SummaryRecord>, SummarizeError> {
    let documents = strategy.reconstruct().await?;
    tracing::info!(
        strategy = strategy.name(),
        documents = documents.len(),
        "Summarizing documents"
    );

    let mut summaries = Vec::with_capacity(documents.len());
    for document in documents {
        match strategy.summarize_document(&document).await {
            Ok(summary) => {
                tracing::debug!(source = %document.source, "Summary generated");
                summaries.push(SummaryRecord {
                    doc_id: document.doc_id,
                    source: document.source,
                    summary,
                    content_length: document.content_length,
                    metadata: document.metadata,
                });
            }
            Err(error) => {
                tracing::warn!(
                    strategy = strategy.name(),
                    source = %document.source,
                    error = %error,
                    "Skipping document that failed to summarize"
                );
            }
        }
    }

    if summaries.is_empty() {
        return Err(SummarizeError::NoSummarizableContent);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;

    struct FixedStrategy {
        sources: Vec<&'static str>,
        failing: &'static str,
    }

    #[async_trait]
    impl SourceReconstructionStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn reconstruct(&self) -> Result<Vec<ReconstructedDocument>, SummarizeError> {
            Ok(self
                .sources
                .iter()
                .map(|source| ReconstructedDocument {
                    doc_id: source.to_string(),
                    source: source.to_string(),
                    text: format!("text of {source}"),
                    content_length: 10,
                    metadata: SummaryMetadata::default(),
                })
                .collect())
        }

        async fn summarize_document(
            &self,
            document: &ReconstructedDocument,
        ) -> Result<String, TransientIndexError> {
            if document.source == self.failing {
                return Err(TransientIndexError::Completion(
                    CompletionError::GenerationFailed("boom".into()),
                ));
            }
            Ok(format!("summary of {}", document.source))
        }
    }

    #[tokio::test]
    async fn failing_documents_are_skipped() {
        let strategy = FixedStrategy {
            sources: vec!["a.pdf", "b.pdf", "c.pdf"],
            failing: "b.pdf",
        };
        let summaries = summarize_all(&strategy).await.expect("summaries");
        let sources: Vec<_> = summaries.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["a.pdf", "c.pdf"]);
        assert_eq!(summaries[0].summary, "summary of a.pdf");
    }

    #[tokio::test]
    async fn zero_summaries_is_an_error() {
        let strategy = FixedStrategy {
            sources: vec!["only.pdf"],
            failing: "only.pdf",
        };
        assert!(matches!(
            summarize_all(&strategy).await,
            Err(SummarizeError::NoSummarizableContent)
        ));

        let empty = FixedStrategy {
            sources: vec![],
            failing: "",
        };
        assert!(matches!(
            summarize_all(&empty).await,
            Err(SummarizeError::NoSummarizableContent)
        ));
    }
}
