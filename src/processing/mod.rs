//! Document pipeline: hashing, loading, indexing, retrieval, summarization, and reset.

pub mod chunking;
pub mod hasher;
mod indexer;
pub mod loader;
mod mappers;
pub mod prompts;
mod query;
mod relations;
mod reset;
mod service;
pub mod snapshot;
pub mod summarize;
#[cfg(test)]
mod test_support;
mod transient;
pub mod types;

pub use indexer::Indexer;
pub use query::QueryEngine;
pub use relations::RelationAnalyzer;
pub use reset::reset_index;
pub use service::{RagApi, RagService, ServiceInitError, StrategyKind};
pub use types::{
    ChunkingError, DocumentListing, DocumentMetadata, IndexInfo, IndexOutcome, IndexingError,
    ListError, LoaderError, LogicalDocument, QueryAnswer, QueryError, RelationReport, ResetError,
    ResetOutcome, SnapshotError, Source, SummarizeError, SummaryMetadata, SummaryRecord,
    SummaryReport, TransientIndexError, UploadError, UploadOutcome,
};
