//! Wire schema of the change topic.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle operation, encoded as a single letter on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOp {
    #[serde(rename = "c")]
    Create,
    #[serde(rename = "u")]
    Update,
    #[serde(rename = "d")]
    Delete,
}

/// Event emitted for uploaded-document lifecycle changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub op: EventOp,
    /// Milliseconds since the epoch at publish time.
    pub ts_ms: i64,
    pub document_id: Uuid,
    pub version: i32,
    /// Snapshot of the document row the worker needs to fetch and extract:
    /// filename, mime_type, size, bucket, object_key, plus the row metadata.
    pub metadata: serde_json::Value,
    pub owner_id: Uuid,
}

/// Event emitted for url/text source lifecycle changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlSourceEvent {
    pub op: EventOp,
    pub ts_ms: i64,
    pub source_id: Uuid,
    pub version: i32,
    /// The source's `source_metadata` JSON (`url` or `content`).
    pub metadata: serde_json::Value,
    pub owner_id: Uuid,
}

/// Union of the two record shapes on the change topic. Untagged: the worker
/// discriminates on whether the record carries a `document_id` or a
/// `source_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeEvent {
    Document(DocumentEvent),
    UrlSource(UrlSourceEvent),
}

impl ChangeEvent {
    pub fn document(
        op: EventOp,
        document_id: Uuid,
        version: i32,
        metadata: serde_json::Value,
        owner_id: Uuid,
    ) -> Self {
        ChangeEvent::Document(DocumentEvent {
            op,
            ts_ms: Utc::now().timestamp_millis(),
            document_id,
            version,
            metadata,
            owner_id,
        })
    }

    pub fn url_source(
        op: EventOp,
        source_id: Uuid,
        version: i32,
        metadata: serde_json::Value,
        owner_id: Uuid,
    ) -> Self {
        ChangeEvent::UrlSource(UrlSourceEvent {
            op,
            ts_ms: Utc::now().timestamp_millis(),
            source_id,
            version,
            metadata,
            owner_id,
        })
    }

    /// Partition key: the primary entity id.
    pub fn key(&self) -> String {
        match self {
            ChangeEvent::Document(e) => e.document_id.to_string(),
            ChangeEvent::UrlSource(e) => e.source_id.to_string(),
        }
    }

    pub fn op(&self) -> EventOp {
        match self {
            ChangeEvent::Document(e) => e.op,
            ChangeEvent::UrlSource(e) => e.op,
        }
    }
}
