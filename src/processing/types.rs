//! Core data types and error definitions for the retrieval pipeline.

use crate::{completion::CompletionError, embedding::EmbeddingClientError, store::StoreError};
use anyhow::Error as TokenizerError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning raw text into semantic chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Configuration requested an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Embedding model we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Errors raised while reading uploaded files into logical documents.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Directory is missing, empty, or holds nothing parseable.
    #[error("no documents found in '{}'", .0.display())]
    NoDocumentsFound(PathBuf),
    /// File could not be read or parsed.
    #[error("failed to read '{}': {message}", path.display())]
    Unreadable {
        /// File that failed.
        path: PathBuf,
        /// Parser or I/O diagnostic.
        message: String,
    },
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Blocking parse task panicked or was cancelled.
    #[error("document loading task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors raised while chunking, embedding, and storing documents.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// Chunking step failed to segment a document.
    #[error("failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store rejected the write.
    #[error("vector store request failed: {0}")]
    Store(#[from] StoreError),
    /// Snapshot metadata could not be persisted.
    #[error("failed to persist index snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors raised while reading or writing the persisted index snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot file holds malformed JSON.
    #[error("malformed snapshot: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors surfaced by the upload operation.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Only PDF files are accepted.
    #[error("only PDF files are accepted: '{0}'")]
    UnsupportedFileType(String),
    /// File content matches a file that is already stored.
    #[error("document '{filename}' was already uploaded as '{existing}'")]
    DuplicateContent {
        /// Name supplied with the rejected upload.
        filename: String,
        /// Stored file with the same content digest.
        existing: String,
    },
    /// Writing or hashing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored file could not be parsed.
    #[error("failed to load document: {0}")]
    Loader(#[from] LoaderError),
    /// Stored file could not be indexed.
    #[error("failed to index document: {0}")]
    Indexing(#[from] IndexingError),
}

/// Errors surfaced by the query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Collection holds no vectors.
    #[error("no documents indexed")]
    EmptyIndex,
    /// Embedding provider failed to embed the question.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store request failed.
    #[error("vector store request failed: {0}")]
    Store(#[from] StoreError),
    /// Language model failed to synthesize an answer.
    #[error("failed to synthesize answer: {0}")]
    Completion(#[from] CompletionError),
}

/// Errors raised by the throwaway single-document index.
#[derive(Debug, Error)]
pub enum TransientIndexError {
    /// Source text produced no chunks.
    #[error("document produced no indexable chunks")]
    NoChunks,
    /// Chunking step failed.
    #[error("failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// In-memory store rejected the write.
    #[error("vector store request failed: {0}")]
    Store(#[from] StoreError),
    /// Language model failed.
    #[error("language model request failed: {0}")]
    Completion(#[from] CompletionError),
}

/// Errors surfaced by the summarizer.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Nothing was found to summarize.
    #[error("no documents found to summarize")]
    NoDocumentsFound,
    /// Every document failed or was too short.
    #[error("no summaries could be generated for any document")]
    NoSummarizableContent,
    /// Documents could not be loaded from the upload directory.
    #[error("failed to load documents: {0}")]
    Loader(#[from] LoaderError),
    /// Embedding provider failed while probing the index.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store request failed while probing the index.
    #[error("vector store request failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by index reset.
#[derive(Debug, Error)]
pub enum ResetError {
    /// Removing files or directories failed.
    #[error("failed to reset storage: {0}")]
    Io(#[from] std::io::Error),
    /// Deleting the collection failed.
    #[error("failed to delete collection: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced while listing documents.
#[derive(Debug, Error)]
pub enum ListError {
    /// Reading the upload or persist directory failed.
    #[error("failed to list documents: {0}")]
    Io(#[from] std::io::Error),
    /// Counting vectors failed.
    #[error("failed to read index stats: {0}")]
    Store(#[from] StoreError),
}

/// Source metadata attached to a logical document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Filename the document was read from.
    pub file_name: String,
    /// 1-based page label for paged formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
    /// Number of pages in the source file.
    pub page_count: usize,
}

/// One page (or whole file for unpaged formats) of an uploaded document.
#[derive(Debug, Clone)]
pub struct LogicalDocument {
    /// Random identifier assigned at load time.
    pub id: String,
    /// Extracted text.
    pub text: String,
    /// Source metadata.
    pub metadata: DocumentMetadata,
}

/// Result of indexing a batch of logical documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOutcome {
    /// Number of logical documents indexed.
    pub documents: usize,
    /// Number of chunks written to the store.
    pub chunks: usize,
    /// Chunks dropped because an identical chunk already appeared in the same document.
    pub skipped_duplicates: usize,
    /// Chunk size used during splitting.
    pub chunk_size: usize,
}

/// Successful upload of a single file.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Stored filename.
    pub filename: String,
    /// Hex SHA-256 of the stored content.
    pub digest: String,
    /// Pages or units loaded from the file.
    pub documents: usize,
    /// Chunks written to the store.
    pub chunks: usize,
}

/// Evidence attached to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    /// Similarity between the question and the chunk.
    pub score: f32,
    /// Logical document the chunk was cut from.
    pub doc_id: Option<String>,
    /// First 200 characters of the chunk text.
    pub snippet: String,
}

/// Answer synthesized by the query engine.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    /// Natural-language answer.
    pub answer: String,
    /// Chunks that passed the relevance gate.
    pub sources: Vec<Source>,
}

/// Provenance attached to a summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryMetadata {
    /// Filename of the summarized document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Pages that made up the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// Chunks retrieved from the index for the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    /// When the summary was produced (RFC 3339).
    pub processing_date: String,
}

/// Summary of a single source document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    /// Identifier of the summarized document.
    pub doc_id: String,
    /// Human-readable source identifier.
    pub source: String,
    /// Generated summary text.
    pub summary: String,
    /// Character count of the text the summary was built from.
    pub content_length: usize,
    /// Provenance details.
    pub metadata: SummaryMetadata,
}

/// Outcome of cross-document relation analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelationReport {
    /// Narrative produced by the language model.
    Narrative(String),
    /// Too few summaries to compare.
    Insufficient {
        /// Always `false`.
        has_relations: bool,
        /// Why no analysis was run.
        reason: String,
        /// Number of summaries supplied.
        total_docs: usize,
    },
}

impl RelationReport {
    /// Whether the report carries a relation narrative.
    pub fn has_relations(&self) -> bool {
        matches!(self, RelationReport::Narrative(_))
    }
}

/// Summaries plus the relation analysis run over them.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    /// One record per summarized document.
    pub summary: Vec<SummaryRecord>,
    /// Relation analysis; `None` when the analysis itself failed.
    pub relations: Option<RelationReport>,
}

/// Index state reported by document listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndexInfo {
    /// Qdrant-backed index.
    Qdrant {
        /// Always `"qdrant"`.
        backend: &'static str,
        /// Collection holding the chunks.
        collection_name: String,
        /// Vectors stored in the collection.
        num_vectors: u64,
    },
    /// In-process index.
    Local {
        /// Always `"local"`.
        backend: &'static str,
        /// Files present in the persist directory.
        persisted_files: Vec<String>,
        /// Vectors held in memory.
        num_items: u64,
    },
}

/// Uploaded files and index state.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentListing {
    /// PDF files present in the upload directory.
    pub uploaded_files: Vec<String>,
    /// Vector index state.
    pub index_info: IndexInfo,
}

/// Result of a completed reset.
#[derive(Debug, Clone, Serialize)]
pub struct ResetOutcome {
    /// Always `"success"`.
    pub status: &'static str,
    /// Human-readable confirmation.
    pub message: String,
}
