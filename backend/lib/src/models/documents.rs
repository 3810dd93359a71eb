use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::{Document, ProcessingStatus};

#[derive(Debug, Clone, Serialize)]
pub struct DocumentPublic {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub bucket: String,
    pub object_key: String,
    pub metadata: serde_json::Value,
    pub status: ProcessingStatus,
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Document> for DocumentPublic {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            owner_id: document.owner_id,
            filename: document.filename,
            mime_type: document.mime_type,
            size: document.size,
            bucket: document.bucket,
            object_key: document.object_key,
            metadata: document.metadata,
            status: document.status,
            version: document.version,
            source_id: document.source_id,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentsPublic {
    pub documents: Vec<DocumentPublic>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub documents: Vec<DocumentPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_uploads: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentResponse {
    pub message: String,
    pub document_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    pub message: String,
    pub deleted_count: usize,
    pub total_requested: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_deletions: Option<Vec<String>>,
}

fn default_expires_minutes() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
pub struct PresignQuery {
    pub key: String,
    #[serde(default = "default_expires_minutes")]
    pub expires_minutes: u64,
}

#[derive(Debug, Serialize)]
pub struct PresignResponse {
    pub url: String,
    pub bucket: String,
    pub key: String,
}
