//! Purges uploaded PDFs, the vector collection, and persisted index state.

use super::{
    loader::is_pdf,
    types::{ResetError, ResetOutcome},
};
use crate::store::VectorStore;
use std::io;
use std::path::Path;

/// Delete every PDF in `upload_dir`, drop `collection`, and recreate an empty `persist_dir`.
///
/// Safe to repeat. Steps run in order and are not rolled back when a later step fails.
pub async fn reset_index(
    upload_dir: &Path,
    persist_dir: &Path,
    store: &dyn VectorStore,
    collection: &str,
) -> Result<ResetOutcome, ResetError> {
    let removed = remove_pdfs(upload_dir).await?;
    store.delete_collection(collection).await?;

    match tokio::fs::remove_dir_all(persist_dir).await {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }
    tokio::fs::create_dir_all(persist_dir).await?;

    tracing::info!(
        removed_files = removed,
        collection,
        persist_dir = %persist_dir.display(),
        "Index reset"
    );
    Ok(ResetOutcome {
        status: "success",
        message: "Index and PDF files removed.".to_string(),
    })
}

async fn remove_pdfs(upload_dir: &Path) -> Result<usize, io::Error> {
    let mut entries = match tokio::fs::read_dir(upload_dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(error) => return Err(error),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if entry.file_type().await?.is_file() && is_pdf(&name.to_string_lossy()) {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
