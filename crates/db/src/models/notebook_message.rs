use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{schema::notebook_message, DbConnection};

/// One turn of a notebook conversation. `used_sources` records which
/// source ids the assistant cited, stored as a JSON array.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = notebook_message)]
pub struct NotebookMessage {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub role: String,
    pub content: String,
    pub used_sources: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

impl NotebookMessage {
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
        role: impl Into<String>,
        content: impl Into<String>,
        used_sources: Option<serde_json::Value>,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(notebook_message::table)
            .values((
                notebook_message::id.eq(Uuid::now_v7()),
                notebook_message::notebook_id.eq(notebook_id),
                notebook_message::role.eq(role.into()),
                notebook_message::content.eq(content.into()),
                notebook_message::used_sources.eq(used_sources),
                notebook_message::created_at.eq(Utc::now().naive_utc()),
            ))
            .returning(NotebookMessage::as_select())
            .get_result(conn)
            .await
    }

    pub async fn list_for_notebook<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        notebook_message::table
            .filter(notebook_message::notebook_id.eq(notebook_id))
            .order(notebook_message::created_at.asc())
            .offset(offset)
            .limit(limit)
            .load(conn)
            .await
    }

    pub async fn count_for_notebook<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        notebook_message::table
            .filter(notebook_message::notebook_id.eq(notebook_id))
            .count()
            .get_result(conn)
            .await
    }
}
