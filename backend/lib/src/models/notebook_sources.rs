use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sources::SourcePublic;
use crate::repository::NotebookSource;

#[derive(Debug, Deserialize)]
pub struct NotebookSourceCreate {
    pub source_id: Uuid,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NotebookSourceUpdate {
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct NotebookSourcePublic {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub source_id: Uuid,
    pub position: i32,
    pub added_at: NaiveDateTime,
    pub source: SourcePublic,
}

impl NotebookSourcePublic {
    pub fn from_membership(membership: NotebookSource, source: SourcePublic) -> Self {
        Self {
            id: membership.id,
            notebook_id: membership.notebook_id,
            source_id: membership.source_id,
            position: membership.position,
            added_at: membership.added_at,
            source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotebookSourcesPublic {
    pub data: Vec<NotebookSourcePublic>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DetachResponse {
    pub message: String,
    pub notebook_id: Uuid,
    pub source_id: Uuid,
}
