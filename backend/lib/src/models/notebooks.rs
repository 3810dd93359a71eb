use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::Notebook;

#[derive(Debug, Deserialize)]
pub struct NotebookCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotebookUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotebookPublic {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub source_count: i64,
}

impl NotebookPublic {
    pub fn from_notebook(notebook: Notebook, source_count: i64) -> Self {
        Self {
            id: notebook.id,
            owner_id: notebook.owner_id,
            title: notebook.title,
            description: notebook.description,
            created_at: notebook.created_at,
            updated_at: notebook.updated_at,
            source_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotebooksPublic {
    pub data: Vec<NotebookPublic>,
    pub count: i64,
}

/// Outcome of deleting one orphaned source during notebook deletion.
#[derive(Debug, Clone, Serialize)]
pub struct FailedSourceDeletion {
    pub source_id: Uuid,
    pub title: String,
    pub error: String,
}

/// Summary of the orphan cascade performed by a notebook deletion.
#[derive(Debug, Default, Serialize)]
pub struct CleanupSummary {
    pub total_orphaned: usize,
    pub successfully_deleted: usize,
    pub deleted_source_ids: Vec<Uuid>,
    pub failed_deletions: Vec<FailedSourceDeletion>,
}

#[derive(Debug, Serialize)]
pub struct NotebookDeleteResponse {
    pub message: String,
    pub notebook_id: Uuid,
    pub cleanup_summary: CleanupSummary,
}
