use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload and indexing activity.
#[derive(Default)]
pub struct IndexMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
}

impl IndexMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an indexed upload and the number of chunks it produced.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of indexing counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of uploads indexed since startup.
    pub documents_indexed: u64,
    /// Total chunk count written across all indexed uploads.
    pub chunks_indexed: u64,
}
