//! Helpers for translating chunks to and from Qdrant payloads.

use crate::qdrant::types::{PointInsert, ScoredPoint};
use crate::store::{Node, NodeMetadata, ScoredNode};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Build the point (id, vector, payload) stored for a chunk.
pub(crate) fn build_point(node: Node, timestamp_rfc3339: &str) -> PointInsert {
    let Node {
        id,
        ref_doc_id,
        text,
        chunk_hash,
        vector,
        metadata,
    } = node;

    let mut payload = Map::new();
    payload.insert("text".into(), Value::String(text));
    payload.insert("ref_doc_id".into(), Value::String(ref_doc_id));
    payload.insert("chunk_hash".into(), Value::String(chunk_hash));
    payload.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    if let Ok(Value::Object(fields)) = serde_json::to_value(metadata) {
        payload.extend(fields);
    }

    PointInsert {
        id,
        vector,
        payload: Value::Object(payload),
    }
}

/// Map a Qdrant scored point back into a typed chunk.
pub(crate) fn scored_node_from_point(point: ScoredPoint) -> ScoredNode {
    let ScoredPoint { id, score, payload } = point;
    let mut payload = payload.unwrap_or_default();

    let text = match payload.remove("text") {
        Some(Value::String(value)) => value,
        _ => String::new(),
    };
    let ref_doc_id = match payload.remove("ref_doc_id") {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value),
        _ => None,
    };
    let metadata = NodeMetadata {
        file_name: string_field(&payload, "file_name"),
        source: string_field(&payload, "source"),
        page_label: string_field(&payload, "page_label"),
        page_count: payload
            .get("page_count")
            .and_then(Value::as_u64)
            .map(|value| value as usize),
    };

    ScoredNode {
        id,
        score,
        text,
        ref_doc_id,
        metadata,
    }
}

fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
