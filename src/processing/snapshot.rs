//! Persisted index metadata written after every successful index operation.

use super::types::SnapshotError;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Filename of the snapshot inside the persist directory.
pub const SNAPSHOT_FILE: &str = "index_snapshot.json";

/// Logical document recorded in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Logical document identifier (the chunks' `ref_doc_id`).
    pub doc_id: String,
    /// Source filename.
    pub file_name: String,
    /// Page label, when the source is paged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
    /// Identifiers of the chunks cut from the document.
    pub node_ids: Vec<String>,
}

/// Index metadata persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Collection the chunks were written to.
    pub collection: String,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
    /// Every logical document indexed since the last reset.
    pub documents: Vec<SnapshotEntry>,
}

impl IndexSnapshot {
    /// Path of the snapshot file inside `persist_dir`.
    pub fn path(persist_dir: &Path) -> PathBuf {
        persist_dir.join(SNAPSHOT_FILE)
    }

    /// Read the snapshot, returning an empty one when none has been written.
    pub async fn load(persist_dir: &Path) -> Result<Self, SnapshotError> {
        match tokio::fs::read(Self::path(persist_dir)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    /// Append `entries`, replacing any with the same `doc_id`, and write the snapshot back.
    pub async fn record(
        persist_dir: &Path,
        collection: &str,
        timestamp: String,
        entries: Vec<SnapshotEntry>,
    ) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::load(persist_dir).await?;
        snapshot.collection = collection.to_string();
        snapshot.updated_at = timestamp;
        for entry in entries {
            snapshot.documents.retain(|existing| existing.doc_id != entry.doc_id);
            snapshot.documents.push(entry);
        }

        tokio::fs::create_dir_all(persist_dir).await?;
        let body = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(Self::path(persist_dir), body).await?;
        tracing::debug!(
            path = %Self::path(persist_dir).display(),
            documents = snapshot.documents.len(),
            "Persisted index snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(doc_id: &str, nodes: &[&str]) -> SnapshotEntry {
        SnapshotEntry {
            doc_id: doc_id.into(),
            file_name: "a.pdf".into(),
            page_label: Some("1".into()),
            node_ids: nodes.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = IndexSnapshot::load(&dir.path().join("storage"))
            .await
            .expect("load");
        assert!(snapshot.documents.is_empty());
    }

    #[tokio::test]
    async fn record_merges_entries_by_doc_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let persist = dir.path().join("storage");
        IndexSnapshot::record(&persist, "docs", "t1".into(), vec![entry("d1", &["n1"])])
            .await
            .expect("first");
        let snapshot = IndexSnapshot::record(
            &persist,
            "docs",
            "t2".into(),
            vec![entry("d1", &["n2"]), entry("d2", &["n3"])],
        )
        .await
        .expect("second");

        assert_eq!(snapshot.updated_at, "t2");
        assert_eq!(snapshot.documents.len(), 2);
        let reloaded = IndexSnapshot::load(&persist).await.expect("reload");
        assert_eq!(reloaded, snapshot);
        assert_eq!(reloaded.documents[0].node_ids, vec!["n2".to_string()]);
    }

    #[tokio::test]
    async fn malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(IndexSnapshot::path(dir.path()), b"{not json").expect("write");
        assert!(matches!(
            IndexSnapshot::load(dir.path()).await,
            Err(SnapshotError::Serde(_))
        ));
    }
}
