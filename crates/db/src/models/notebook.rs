use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{
    schema::{notebook, notebook_source},
    DbConnection,
};

/// A user-owned workspace binding an ordered set of sources and a message
/// history. Deleting a notebook cascades to its junction rows and messages
/// at the database level; orphaned-source cleanup is handled above this
/// layer.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = notebook)]
pub struct Notebook {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Notebook {
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, diesel::result::Error> {
        let now = Utc::now().naive_utc();
        diesel::insert_into(notebook::table)
            .values((
                notebook::id.eq(Uuid::now_v7()),
                notebook::owner_id.eq(owner_id),
                notebook::title.eq(title.into()),
                notebook::description.eq(description),
                notebook::created_at.eq(now),
                notebook::updated_at.eq(now),
            ))
            .returning(Notebook::as_select())
            .get_result(conn)
            .await
    }

    pub async fn get_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        notebook::table
            .filter(notebook::id.eq(id))
            .filter(notebook::owner_id.eq(owner_id))
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        notebook::table
            .filter(notebook::owner_id.eq(owner_id))
            .order(notebook::updated_at.desc())
            .offset(offset)
            .limit(limit)
            .load(conn)
            .await
    }

    pub async fn count_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        notebook::table
            .filter(notebook::owner_id.eq(owner_id))
            .count()
            .get_result(conn)
            .await
    }

    pub async fn update_fields<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Self, diesel::result::Error> {
        if let Some(title) = title {
            diesel::update(notebook::table)
                .filter(notebook::id.eq(id))
                .set(notebook::title.eq(title))
                .execute(conn)
                .await?;
        }
        if let Some(description) = description {
            diesel::update(notebook::table)
                .filter(notebook::id.eq(id))
                .set(notebook::description.eq(description))
                .execute(conn)
                .await?;
        }
        diesel::update(notebook::table)
            .filter(notebook::id.eq(id))
            .set(notebook::updated_at.eq(Utc::now().naive_utc()))
            .returning(Notebook::as_select())
            .get_result(conn)
            .await
    }

    pub async fn source_count<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        notebook_source::table
            .filter(notebook_source::notebook_id.eq(id))
            .count()
            .get_result(conn)
            .await
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(notebook::table)
            .filter(notebook::id.eq(id))
            .execute(conn)
            .await
    }
}
