#![deny(missing_docs)]

//! Retrieval-augmented question answering and summarization over uploaded PDFs.

/// HTTP routing and REST handlers.
pub mod api;
/// Language model client abstraction and adapters.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Indexing metrics helpers.
pub mod metrics;
/// Document pipeline and service facade.
pub mod processing;
/// Qdrant REST integration.
pub mod qdrant;
/// Vector store abstraction with Qdrant and in-memory backends.
pub mod store;
