use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::NotebookMessage;

#[derive(Debug, Deserialize)]
pub struct NotebookMessageCreate {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub used_sources: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct NotebookMessagePublic {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_sources: Option<Vec<Uuid>>,
    pub created_at: NaiveDateTime,
}

impl From<NotebookMessage> for NotebookMessagePublic {
    fn from(message: NotebookMessage) -> Self {
        Self {
            id: message.id,
            notebook_id: message.notebook_id,
            role: message.role,
            content: message.content,
            used_sources: message.used_sources,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotebookMessagesPublic {
    pub data: Vec<NotebookMessagePublic>,
    pub count: i64,
}
