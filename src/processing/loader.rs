//! Reads uploaded files into per-page logical documents.
//!
//! Only PDFs are read, matching what upload accepts and reset removes. Each page with
//! non-blank text becomes one document. Parsing is CPU-bound and runs on the blocking pool.

use super::types::{DocumentMetadata, LoaderError, LogicalDocument};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Load every PDF directly inside `dir`, sorted by filename. Other files are ignored.
///
/// Unparseable files are logged and skipped. Fails with [`LoaderError::NoDocumentsFound`] when
/// the directory is missing, empty, or yields no text at all.
pub async fn load_all(dir: &Path) -> Result<Vec<LogicalDocument>, LoaderError> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || load_dir_blocking(&dir)).await?
}

/// Load a single file, propagating parse errors.
pub async fn load_file(path: &Path) -> Result<Vec<LogicalDocument>, LoaderError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let documents = load_path_blocking(&path)?;
        if documents.is_empty() {
            return Err(LoaderError::NoDocumentsFound(path));
        }
        Ok(documents)
    })
    .await?
}

/// Group logical documents by filename with a trailing `.pdf` removed, preserving page order.
pub fn group_by_file(documents: Vec<LogicalDocument>) -> BTreeMap<String, Vec<LogicalDocument>> {
    let mut grouped: BTreeMap<String, Vec<LogicalDocument>> = BTreeMap::new();
    for document in documents {
        grouped
            .entry(base_filename(&document.metadata.file_name).to_string())
            .or_default()
            .push(document);
    }
    grouped
}

/// Strip a trailing `.pdf` from a filename.
pub fn base_filename(file_name: &str) -> &str {
    file_name.strip_suffix(".pdf").unwrap_or(file_name)
}

/// Whether a filename carries a `.pdf` extension, ignoring case.
pub fn is_pdf(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn load_dir_blocking(dir: &Path) -> Result<Vec<LogicalDocument>, LoaderError> {
    if !dir.is_dir() {
        return Err(LoaderError::NoDocumentsFound(dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        match load_path_blocking(entry.path()) {
            Ok(mut loaded) => documents.append(&mut loaded),
            Err(error) => {
                tracing::warn!(path = %entry.path().display(), error = %error, "Skipping unreadable file");
            }
        }
    }

    if documents.is_empty() {
        return Err(LoaderError::NoDocumentsFound(dir.to_path_buf()));
    }
    tracing::debug!(dir = %dir.display(), documents = documents.len(), "Loaded documents");
    Ok(documents)
}

fn load_path_blocking(path: &Path) -> Result<Vec<LogicalDocument>, LoaderError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !is_pdf(&file_name) {
        tracing::debug!(path = %path.display(), "Skipping non-PDF file");
        return Ok(Vec::new());
    }
    load_pdf(path, file_name)
}

fn load_pdf(path: &Path, file_name: String) -> Result<Vec<LogicalDocument>, LoaderError> {
    let document = lopdf::Document::load(path).map_err(|error| unreadable(path, error))?;
    let pages = document.get_pages();
    let page_count = pages.len();
    tracing::debug!(path = %path.display(), page_count, "Extracting text from PDF");

    let mut documents = Vec::with_capacity(page_count);
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => documents.push(LogicalDocument {
                id: Uuid::new_v4().to_string(),
                text,
                metadata: DocumentMetadata {
                    file_name: file_name.clone(),
                    page_label: Some(page_number.to_string()),
                    page_count,
                },
            }),
            Ok(_) => {
                tracing::debug!(path = %path.display(), page = page_number, "Page has no text");
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), page = page_number, error = %error, "Failed to extract page text, skipping");
            }
        }
    }
    Ok(documents)
}

fn unreadable(path: &Path, error: impl std::fmt::Display) -> LoaderError {
    LoaderError::Unreadable {
        path: PathBuf::from(path),
        message: error.to_string(),
    }
}
