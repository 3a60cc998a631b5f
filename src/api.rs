//! HTTP surface for the PDF retrieval service.
//!
//! - `POST /upload-pdf/` – Multipart upload (`files` field, repeatable). Each file is hashed,
//!   deduplicated, stored, and indexed; the response reports one result per file.
//! - `GET /list-documents/` – Uploaded PDFs plus vector index state.
//! - `GET /query?q=…` – Answer a question from the indexed chunks.
//! - `GET /summarize-docs` – Summaries rebuilt from the upload directory, plus relations.
//! - `GET /summarize-docs_byvector` – Summaries rebuilt from the vector index, plus relations.
//! - `DELETE /reset-index` – Remove uploads, vectors, and persisted index state.
//! - `GET /metrics` – Upload and indexing counters.
//!
//! Errors render as `{ "detail": message }`.

use crate::processing::{
    ListError, QueryError, RagApi, ResetError, StrategyKind, SummarizeError, UploadError,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const UPLOAD_FIELD: &str = "files";

/// Build the HTTP router over `service`, allowing cross-origin calls from `allowed_origins`.
pub fn create_router<S>(service: Arc<S>, allowed_origins: &[String]) -> Router
where
    S: RagApi + 'static,
{
    Router::new()
        .route("/upload-pdf/", post(upload_pdfs::<S>))
        .route("/list-documents/", get(list_documents::<S>))
        .route("/query", get(query::<S>))
        .route("/summarize-docs", get(summarize_by_reload::<S>))
        .route("/summarize-docs_byvector", get(summarize_by_vector::<S>))
        .route("/reset-index", delete(reset_index::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Per-file entry of the upload response.
#[derive(Debug, Serialize)]
struct UploadResult {
    filename: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u16>,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<usize>,
}

impl UploadResult {
    fn malformed(filename: String, detail: String) -> Self {
        Self {
            filename,
            status: "error",
            code: Some(StatusCode::BAD_REQUEST.as_u16()),
            detail,
            chunks: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    results: Vec<UploadResult>,
}

/// Upload one or more PDFs.
///
/// A failing file does not abort the batch; its entry carries `status: "error"`, the status code
/// the failure maps to, and the error message. A body that breaks off mid-stream keeps the results
/// already produced and ends with a 400 entry.
async fn upload_pdfs<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: RagApi,
{
    let mut results = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                if results.is_empty() {
                    return Err(AppError::bad_request(error.to_string()));
                }
                results.push(UploadResult::malformed(String::new(), error.to_string()));
                break;
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => {
                if results.is_empty() {
                    return Err(AppError::bad_request(error.to_string()));
                }
                results.push(UploadResult::malformed(filename, error.to_string()));
                break;
            }
        };

        let result = match service.upload(&filename, bytes.to_vec()).await {
            Ok(outcome) => UploadResult {
                detail: format!("Document '{}' uploaded and indexed", outcome.filename),
                filename: outcome.filename,
                status: "success",
                code: None,
                chunks: Some(outcome.chunks),
            },
            Err(error) => UploadResult {
                filename,
                status: "error",
                code: Some(upload_status(&error).as_u16()),
                detail: error.to_string(),
                chunks: None,
            },
        };
        results.push(result);
    }

    if results.is_empty() {
        return Err(AppError::bad_request(format!(
            "no files supplied in the '{UPLOAD_FIELD}' field"
        )));
    }
    Ok(Json(UploadResponse { results }))
}

fn upload_status(error: &UploadError) -> StatusCode {
    match error {
        UploadError::UnsupportedFileType(_) | UploadError::DuplicateContent { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn list_documents<S>(State(service): State<Arc<S>>) -> Result<Response, AppError>
where
    S: RagApi,
{
    Ok(Json(service.list_documents().await?).into_response())
}

#[derive(Deserialize)]
struct QueryParams {
    q: String,
}

/// Answer `q` and echo it back alongside the answer and its sources.
async fn query<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError>
where
    S: RagApi,
{
    let answer = service.query(&params.q).await?;
    tracing::info!(sources = answer.sources.len(), "Query answered");
    Ok(Json(json!({ "query": params.q, "response": answer })).into_response())
}

async fn summarize_by_reload<S>(State(service): State<Arc<S>>) -> Result<Response, AppError>
where
    S: RagApi,
{
    Ok(Json(service.summarize(StrategyKind::Reload).await?).into_response())
}

async fn summarize_by_vector<S>(State(service): State<Arc<S>>) -> Result<Response, AppError>
where
    S: RagApi,
{
    Ok(Json(service.summarize(StrategyKind::Vector).await?).into_response())
}

async fn reset_index<S>(State(service): State<Arc<S>>) -> Result<Response, AppError>
where
    S: RagApi,
{
    Ok(Json(service.reset_index().await?).into_response())
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Response
where
    S: RagApi,
{
    Json(service.metrics_snapshot()).into_response()
}

/// Error rendered as `{ "detail": message }` with a mapped status code.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.message, "Request failed");
        }
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(error: QueryError) -> Self {
        let status = match error {
            QueryError::EmptyIndex => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl From<SummarizeError> for AppError {
    fn from(error: SummarizeError) -> Self {
        let status = match error {
            SummarizeError::NoDocumentsFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl From<ListError> for AppError {
    fn from(error: ListError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl From<ResetError> for AppError {
    fn from(error: ResetError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}
