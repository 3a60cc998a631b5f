//! Cross-document relation analysis over per-document summaries.

use super::{
    chunking::TextSplitter,
    prompts::{RELATION_PROMPT, RELATION_QUERY},
    transient::TransientIndex,
    types::{
        DocumentMetadata, LogicalDocument, RelationReport, SummaryRecord, TransientIndexError,
    },
};
use crate::{completion::CompletionClient, embedding::EmbeddingClient};
use std::sync::Arc;

const INSUFFICIENT_REASON: &str = "need at least 2 documents";
const SEPARATOR_WIDTH: usize = 50;

/// Asks the language model how a set of summarized documents relate to each other.
pub struct RelationAnalyzer {
    splitter: TextSplitter,
    embedding: Arc<dyn EmbeddingClient>,
    completion: Arc<dyn CompletionClient>,
    context_chunks: usize,
}

impl RelationAnalyzer {
    /// Build an analyzer retrieving `context_chunks` chunks of the combined summaries.
    pub fn new(
        splitter: TextSplitter,
        embedding: Arc<dyn EmbeddingClient>,
        completion: Arc<dyn CompletionClient>,
        context_chunks: usize,
    ) -> Self {
        Self {
            splitter,
            embedding,
            completion,
            context_chunks,
        }
    }

    /// Analyze relations across `summaries`.
    ///
    /// Fewer than two summaries yield [`RelationReport::Insufficient`] without any provider call.
    pub async fn analyze(
        &self,
        summaries: &[SummaryRecord],
    ) -> Result<RelationReport, TransientIndexError> {
        if summaries.len() < 2 {
            return Ok(RelationReport::Insufficient {
                has_relations: false,
                reason: INSUFFICIENT_REASON.to_string(),
                total_docs: summaries.len(),
            });
        }

        let combined = LogicalDocument {
            id: "relations".to_string(),
            text: combine_summaries(summaries),
            metadata: DocumentMetadata {
                file_name: "combined-summaries".to_string(),
                page_label: None,
                page_count: 1,
            },
        };
        let index = TransientIndex::build(&combined, &self.splitter, self.embedding.clone()).await?;
        let narrative = index
            .ask(
                self.completion.as_ref(),
                RELATION_PROMPT,
                RELATION_QUERY,
                self.context_chunks,
            )
            .await?;
        tracing::info!(documents = summaries.len(), "Relation analysis complete");
        Ok(RelationReport::Narrative(narrative))
    }
}

/// Concatenate summaries into numbered blocks separated by a dashed rule.
fn combine_summaries(summaries: &[SummaryRecord]) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    summaries
        .iter()
        .enumerate()
        .map(|(i, record)| {
            format!(
                "Document {}:\n\n{}\n\n{}\n\n{separator}\n\n",
                i + 1,
                record.source,
                record.summary
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::processing::test_support::RecordingCompletion;
    use crate::processing::types::SummaryMetadata;

    fn record(source: &str, summary: &str) -> SummaryRecord {
        SummaryRecord {
            doc_id: source.into(),
            source: source.into(),
            summary: summary.into(),
            content_length: summary.len(),
            metadata: SummaryMetadata::default(),
        }
    }

    fn analyzer(completion: Arc<RecordingCompletion>) -> RelationAnalyzer {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = crate::config::test_config(dir.path());
        RelationAnalyzer::new(
            TextSplitter::from_config(&config).expect("splitter"),
            Arc::new(HashEmbeddingClient::new(config.embedding_dimension)),
            completion,
            config.retrieval.relation_context_chunks,
        )
    }

    #[tokio::test]
    async fn single_summary_is_insufficient_without_llm_call() {
        let completion = Arc::new(RecordingCompletion::new("unused"));
        let report = analyzer(completion.clone())
            .analyze(&[record("a.pdf", "About apples.")])
            .await
            .expect("report");

        assert_eq!(
            report,
            RelationReport::Insufficient {
                has_relations: false,
                reason: INSUFFICIENT_REASON.into(),
                total_docs: 1,
            }
        );
        assert!(!report.has_relations());
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn two_summaries_yield_a_narrative() {
        let completion = Arc::new(RecordingCompletion::new("Both documents discuss fruit."));
        let report = analyzer(completion.clone())
            .analyze(&[
                record("a.pdf", "About apples."),
                record("b.pdf", "About pears."),
            ])
            .await
            .expect("report");

        assert_eq!(
            report,
            RelationReport::Narrative("Both documents discuss fruit.".into())
        );
        assert_eq!(completion.calls(), 1);
        let prompt = &completion.prompts()[0];
        assert!(prompt.contains("Document 1:"));
        assert!(prompt.contains("b.pdf"));
    }

    #[test]
    fn combined_blocks_are_numbered_and_separated() {
        let text = combine_summaries(&[record("a.pdf", "one"), record("b.pdf", "two")]);
        assert!(text.starts_with("Document 1:\n\na.pdf\n\none\n\n-----"));
        assert!(text.contains("Document 2:\n\nb.pdf\n\ntwo"));
        assert_eq!(text.matches(&"-".repeat(SEPARATOR_WIDTH)).count(), 2);
    }

    #[test]
    fn insufficient_report_serializes_as_marker() {
        let report = RelationReport::Insufficient {
            has_relations: false,
            reason: INSUFFICIENT_REASON.into(),
            total_docs: 0,
        };
        let value = serde_json::to_value(&report).expect("json");
        assert_eq!(value["has_relations"], false);
        assert_eq!(value["total_docs"], 0);
        let narrative = serde_json::to_value(RelationReport::Narrative("x".into())).expect("json");
        assert_eq!(narrative, serde_json::json!("x"));
    }
}
