//! Mapping helpers between chunks, stored nodes, and API shapes.

use crate::{
    processing::types::{LogicalDocument, Source},
    qdrant::compute_chunk_hash,
    store::{Node, NodeMetadata, ScoredNode},
};
use std::collections::HashSet;
use uuid::Uuid;

const SNIPPET_CHARS: usize = 200;

/// Chunk text with associated hash ready for embedding.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    pub(crate) text: String,
    pub(crate) chunk_hash: String,
}

/// Remove duplicate and blank chunks within a document, keeping the first occurrence.
pub(crate) fn dedupe_chunks(chunks: Vec<String>) -> (Vec<PreparedChunk>, usize) {
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    let mut skipped = 0;

    for text in chunks {
        if text.trim().is_empty() {
            continue;
        }
        let hash = compute_chunk_hash(&text);
        if seen.insert(hash.clone()) {
            prepared.push(PreparedChunk {
                text,
                chunk_hash: hash,
            });
        } else {
            skipped += 1;
        }
    }

    (prepared, skipped)
}

/// Pair a prepared chunk with its vector, inheriting the document's metadata.
pub(crate) fn node_from_chunk(
    document: &LogicalDocument,
    chunk: PreparedChunk,
    vector: Vec<f32>,
) -> Node {
    Node {
        id: Uuid::new_v4().to_string(),
        ref_doc_id: document.id.clone(),
        text: chunk.text,
        chunk_hash: chunk.chunk_hash,
        vector,
        metadata: NodeMetadata {
            file_name: Some(document.metadata.file_name.clone()),
            source: None,
            page_label: document.metadata.page_label.clone(),
            page_count: Some(document.metadata.page_count),
        },
    }
}

/// First 200 characters of `text`, cut at a char boundary.
pub(crate) fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

/// Evidence entry for a retrieved node.
pub(crate) fn source_from_node(node: &ScoredNode) -> Source {
    Source {
        score: node.score,
        doc_id: node.ref_doc_id.clone(),
        snippet: snippet(&node.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::types::DocumentMetadata;

    #[test]
    fn dedupe_chunks_removes_duplicates_and_counts_skips() {
        let chunks = vec![
            "alpha".to_string(),
            "beta".to_string(),
            "  ".to_string(),
            "alpha".to_string(),
        ];
        let (deduped, skipped) = dedupe_chunks(chunks);
        let texts: Vec<_> = deduped.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta"]);
        assert_eq!(skipped, 1);
        assert_ne!(deduped[0].chunk_hash, deduped[1].chunk_hash);
    }

    #[test]
    fn node_inherits_document_metadata() {
        let document = LogicalDocument {
            id: "doc-1".into(),
            text: "body".into(),
            metadata: DocumentMetadata {
                file_name: "a.pdf".into(),
                page_label: Some("3".into()),
                page_count: 4,
            },
        };
        let (mut chunks, _) = dedupe_chunks(vec!["body".into()]);
        let node = node_from_chunk(&document, chunks.remove(0), vec![1.0]);
        assert_eq!(node.ref_doc_id, "doc-1");
        assert_eq!(node.metadata.file_name.as_deref(), Some("a.pdf"));
        assert_eq!(node.metadata.page_label.as_deref(), Some("3"));
        assert_eq!(node.metadata.page_count, Some(4));
        assert!(Uuid::parse_str(&node.id).is_ok());
    }

    #[test]
    fn snippet_counts_characters_not_bytes() {
        let text = "é".repeat(250);
        let cut = snippet(&text);
        assert_eq!(cut.chars().count(), 200);
        assert_eq!(snippet("short"), "short");
    }
}
