//! Service facade coordinating upload, retrieval, summarization, and reset.

use crate::{
    completion::{CompletionClient, CompletionError, build_completion_client},
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client},
    metrics::{IndexMetrics, MetricsSnapshot},
    processing::{
        chunking::TextSplitter,
        hasher::{find_duplicate, hash_reader},
        indexer::Indexer,
        loader::{self, is_pdf},
        query::QueryEngine,
        relations::RelationAnalyzer,
        reset,
        summarize::{ReloadStrategy, SourceReconstructionStrategy, VectorStrategy, summarize_all},
        types::{
            ChunkingError, DocumentListing, IndexInfo, ListError, QueryAnswer, QueryError,
            ResetError, ResetOutcome, SummarizeError, SummaryReport, UploadError, UploadOutcome,
        },
    },
    qdrant::{QdrantError, QdrantService},
    store::{InMemoryVectorStore, StoreError, VectorStore},
};
use async_trait::async_trait;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const STAGING_DIR: &str = ".staging";

/// Which reconstruction strategy a summarize request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Re-read files from the upload directory.
    Reload,
    /// Rebuild documents from chunks in the vector index.
    Vector,
}

/// Errors raised while wiring the service at startup.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Embedding client could not be built.
    #[error("failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Completion client could not be built.
    #[error("failed to initialize completion client: {0}")]
    Completion(#[from] CompletionError),
    /// Qdrant client could not be built.
    #[error("failed to initialize Qdrant client: {0}")]
    Qdrant(#[from] QdrantError),
    /// Tokenizer could not be loaded.
    #[error("failed to initialize text splitter: {0}")]
    Chunking(#[from] ChunkingError),
    /// Primary collection could not be ensured.
    #[error("failed to prepare collection: {0}")]
    Store(#[from] StoreError),
}

/// Operations exposed to the HTTP surface.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Store, deduplicate, and index one uploaded PDF.
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome, UploadError>;

    /// List uploaded PDFs and the vector index state.
    async fn list_documents(&self) -> Result<DocumentListing, ListError>;

    /// Answer a question from the indexed documents.
    async fn query(&self, question: &str) -> Result<QueryAnswer, QueryError>;

    /// Summarize every document and analyze relations between them.
    async fn summarize(&self, strategy: StrategyKind) -> Result<SummaryReport, SummarizeError>;

    /// Remove uploads, vectors, and persisted index state.
    async fn reset_index(&self) -> Result<ResetOutcome, ResetError>;

    /// Current ingestion counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Long-lived owner of the provider clients and the vector store.
///
/// Build once at startup and share through an `Arc`; every component receives its
/// dependencies explicitly from here.
pub struct RagService {
    upload_dir: PathBuf,
    persist_dir: PathBuf,
    collection: String,
    store: Arc<dyn VectorStore>,
    indexer: Indexer,
    query_engine: QueryEngine,
    reload: ReloadStrategy,
    vector: VectorStrategy,
    relations: RelationAnalyzer,
    metrics: Arc<IndexMetrics>,
}

impl RagService {
    /// Wire the service from already-built providers.
    pub fn new(
        config: &Config,
        embedding: Arc<dyn EmbeddingClient>,
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, ChunkingError> {
        let splitter = TextSplitter::from_config(config)?;
        let settings = config.retrieval;
        let collection = config.collection_name.clone();

        Ok(Self {
            upload_dir: config.upload_dir.clone(),
            persist_dir: config.persist_dir.clone(),
            indexer: Indexer::new(
                embedding.clone(),
                store.clone(),
                splitter.clone(),
                collection.clone(),
                config.persist_dir.clone(),
            ),
            query_engine: QueryEngine::new(
                embedding.clone(),
                store.clone(),
                completion.clone(),
                collection.clone(),
                settings,
            ),
            reload: ReloadStrategy::new(
                config.upload_dir.clone(),
                splitter.clone(),
                embedding.clone(),
                completion.clone(),
                settings,
            ),
            vector: VectorStrategy::new(
                embedding.clone(),
                store.clone(),
                completion.clone(),
                collection.clone(),
                settings,
            ),
            relations: RelationAnalyzer::new(
                splitter,
                embedding,
                completion,
                settings.relation_context_chunks,
            ),
            collection,
            store,
            metrics: Arc::new(IndexMetrics::new()),
        })
    }

    /// Build providers and the vector store from configuration and ensure the collection.
    pub async fn build(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!("Initializing embedding client");
        let embedding: Arc<dyn EmbeddingClient> = Arc::from(build_embedding_client(config)?);
        let completion: Arc<dyn CompletionClient> = Arc::from(build_completion_client(config)?);
        let store: Arc<dyn VectorStore> = if config.use_qdrant {
            Arc::new(QdrantService::new(
                &config.qdrant_url,
                config.qdrant_api_key.clone(),
            )?)
        } else {
            tracing::info!("Qdrant disabled; vectors are kept in process memory");
            Arc::new(InMemoryVectorStore::new())
        };

        store
            .ensure_collection(&config.collection_name, embedding.dimension())
            .await?;
        tracing::debug!(collection = %config.collection_name, backend = store.backend(), "Primary collection ready");

        Ok(Self::new(config, embedding, completion, store)?)
    }

    /// Store, deduplicate, and index one uploaded PDF.
    ///
    /// The extension check runs before any I/O. Content is staged under `.staging/` and only
    /// moved into the upload directory once it is indexed, so a failed upload never touches a
    /// stored file of the same name.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome, UploadError> {
        let filename = Path::new(filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| is_pdf(name))
            .ok_or_else(|| UploadError::UnsupportedFileType(filename.to_string()))?;

        let mut cursor = Cursor::new(bytes);
        let digest = hash_reader(&mut cursor)?;

        let upload_dir = self.upload_dir.clone();
        let wanted = digest.clone();
        let existing = tokio::task::spawn_blocking(move || find_duplicate(&upload_dir, &wanted))
            .await
            .map_err(io::Error::other)??;
        if let Some(existing) = existing {
            tracing::info!(filename = %filename, existing = %existing, "Rejected duplicate upload");
            return Err(UploadError::DuplicateContent { filename, existing });
        }

        let staging_dir = self.upload_dir.join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging_dir).await?;
        let staged = staging_dir.join(&filename);
        tokio::fs::write(&staged, cursor.into_inner()).await?;

        let result = match self.index_stored_file(&staged).await {
            Ok(counts) => tokio::fs::rename(&staged, self.upload_dir.join(&filename))
                .await
                .map(|()| counts)
                .map_err(UploadError::from),
            Err(error) => Err(error),
        };

        match result {
            Ok((documents, chunks)) => {
                self.metrics.record_document(chunks as u64);
                tracing::info!(filename = %filename, documents, chunks, "Document uploaded");
                Ok(UploadOutcome {
                    filename,
                    digest,
                    documents,
                    chunks,
                })
            }
            Err(error) => {
                if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                    tracing::warn!(path = %staged.display(), error = %cleanup, "Failed to remove staged upload");
                }
                tracing::error!(filename = %filename, error = %error, "Upload failed");
                Err(error)
            }
        }
    }

    async fn index_stored_file(&self, path: &Path) -> Result<(usize, usize), UploadError> {
        let documents = loader::load_file(path).await?;
        let outcome = self.indexer.index_documents(&documents).await?;
        Ok((outcome.documents, outcome.chunks))
    }

    /// List uploaded PDFs and the vector index state.
    pub async fn list_documents(&self) -> Result<DocumentListing, ListError> {
        let uploaded_files = list_file_names(&self.upload_dir, true).await?;
        let count = self.store.count(&self.collection).await?;
        let index_info = if self.store.backend() == "qdrant" {
            IndexInfo::Qdrant {
                backend: "qdrant",
                collection_name: self.collection.clone(),
                num_vectors: count,
            }
        } else {
            IndexInfo::Local {
                backend: "local",
                persisted_files: list_file_names(&self.persist_dir, false).await?,
                num_items: count,
            }
        };
        Ok(DocumentListing {
            uploaded_files,
            index_info,
        })
    }

    /// Answer a question from the indexed documents.
    pub async fn query(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        self.query_engine.answer(question).await
    }

    /// Summarize every document with `strategy`, then analyze relations between the summaries.
    ///
    /// A failed relation analysis is logged and reported as `None`; the summaries still return.
    pub async fn summarize(&self, strategy: StrategyKind) -> Result<SummaryReport, SummarizeError> {
        let strategy: &dyn SourceReconstructionStrategy = match strategy {
            StrategyKind::Reload => &self.reload,
            StrategyKind::Vector => &self.vector,
        };
        let summary = summarize_all(strategy).await?;
        let relations = match self.relations.analyze(&summary).await {
            Ok(report) => Some(report),
            Err(error) => {
                tracing::warn!(error = %error, "Relation analysis failed");
                None
            }
        };
        Ok(SummaryReport { summary, relations })
    }

    /// Remove uploads, vectors, and persisted index state.
    pub async fn reset_index(&self) -> Result<ResetOutcome, ResetError> {
        reset::reset_index(
            &self.upload_dir,
            &self.persist_dir,
            self.store.as_ref(),
            &self.collection,
        )
        .await
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

async fn list_file_names(dir: &Path, pdf_only: bool) -> Result<Vec<String>, io::Error> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pdf_only || is_pdf(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[async_trait]
impl RagApi for RagService {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome, UploadError> {
        RagService::upload(self, filename, bytes).await
    }

    async fn list_documents(&self) -> Result<DocumentListing, ListError> {
        RagService::list_documents(self).await
    }

    async fn query(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        RagService::query(self, question).await
    }

    async fn summarize(&self, strategy: StrategyKind) -> Result<SummaryReport, SummarizeError> {
        RagService::summarize(self, strategy).await
    }

    async fn reset_index(&self) -> Result<ResetOutcome, ResetError> {
        RagService::reset_index(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RagService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::processing::loader::test_support::write_pdf;
    use crate::processing::test_support::RecordingCompletion;

    struct Harness {
        _dir: tempfile::TempDir,
        root: PathBuf,
        service: RagService,
        completion: Arc<RecordingCompletion>,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        let config = crate::config::test_config(&root);
        let completion = Arc::new(RecordingCompletion::new("synthesized"));
        let service = RagService::new(
            &config,
            Arc::new(HashEmbeddingClient::new(config.embedding_dimension)),
            completion.clone(),
            Arc::new(InMemoryVectorStore::new()),
        )
        .expect("service");
        Harness {
            _dir: dir,
            root,
            service,
            completion,
        }
    }

    fn pdf_bytes(root: &Path, name: &str, pages: &[&str]) -> Vec<u8> {
        let path = root.join(name);
        write_pdf(&path, pages);
        std::fs::read(path).expect("read pdf")
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected_under_any_name() {
        let h = harness();
        let bytes = pdf_bytes(&h.root, "source.pdf", &["Hello World"]);

        h.service
            .upload("first.pdf", bytes.clone())
            .await
            .expect("first upload");
        let error = h
            .service
            .upload("renamed.pdf", bytes)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            UploadError::DuplicateContent { ref existing, .. } if existing == "first.pdf"
        ));
        assert!(!h.root.join("uploads/renamed.pdf").exists());
        assert_eq!(h.service.metrics_snapshot().documents_indexed, 1);
    }

    #[tokio::test]
    async fn non_pdf_upload_changes_nothing() {
        let h = harness();
        let error = h
            .service
            .upload("notes.txt", b"plain text".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(error, UploadError::UnsupportedFileType(_)));
        assert!(!h.root.join("uploads").exists());

        let listing = h.service.list_documents().await.expect("listing");
        assert!(listing.uploaded_files.is_empty());
    }

    #[tokio::test]
    async fn unparseable_pdf_is_removed_after_failure() {
        let h = harness();
        let error = h
            .service
            .upload("broken.pdf", b"%PDF-garbage".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(error, UploadError::Loader(_)));
        assert!(!h.root.join("uploads/broken.pdf").exists());
    }

    #[tokio::test]
    async fn failed_reupload_keeps_stored_file_of_same_name() {
        let h = harness();
        let original = pdf_bytes(&h.root, "source.pdf", &["Original report"]);
        h.service
            .upload("report.pdf", original.clone())
            .await
            .expect("first upload");

        let error = h
            .service
            .upload("report.pdf", b"%PDF-garbage".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(error, UploadError::Loader(_)));

        let stored = std::fs::read(h.root.join("uploads/report.pdf")).expect("stored file");
        assert_eq!(stored, original);
        assert!(!h.root.join("uploads/.staging/report.pdf").exists());

        let listing = h.service.list_documents().await.expect("listing");
        assert_eq!(listing.uploaded_files, vec!["report.pdf".to_string()]);
        assert_eq!(h.service.metrics_snapshot().documents_indexed, 1);
    }

    #[tokio::test]
    async fn upload_path_components_are_stripped() {
        let h = harness();
        let bytes = pdf_bytes(&h.root, "source.pdf", &["Nested name"]);
        let outcome = h
            .service
            .upload("../../escape.pdf", bytes)
            .await
            .expect("upload");
        assert_eq!(outcome.filename, "escape.pdf");
        assert!(h.root.join("uploads/escape.pdf").exists());
    }

    #[tokio::test]
    async fn listing_reports_local_backend_state() {
        let h = harness();
        let bytes = pdf_bytes(&h.root, "source.pdf", &["Hello World"]);
        h.service.upload("doc.pdf", bytes).await.expect("upload");

        let listing = h.service.list_documents().await.expect("listing");
        assert_eq!(listing.uploaded_files, vec!["doc.pdf".to_string()]);
        match listing.index_info {
            IndexInfo::Local {
                persisted_files,
                num_items,
                ..
            } => {
                assert_eq!(persisted_files, vec!["index_snapshot.json".to_string()]);
                assert_eq!(num_items, 1);
            }
            other => panic!("unexpected index info: {other:?}"),
        }
    }

    #[tokio::test]
    async fn summarize_single_document_skips_relation_llm_call() {
        let h = harness();
        let bytes = pdf_bytes(&h.root, "source.pdf", &["Hello World"]);
        h.service.upload("doc.pdf", bytes).await.expect("upload");

        let report = h
            .service
            .summarize(StrategyKind::Reload)
            .await
            .expect("summaries");
        assert_eq!(report.summary.len(), 1);
        assert!(matches!(
            report.relations,
            Some(crate::processing::RelationReport::Insufficient { total_docs: 1, .. })
        ));
        assert_eq!(h.completion.calls(), 1);
    }
}
