use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{
    schema::{notebook_source, source},
    DbConnection, ProcessingStatus, SourceType,
};

/// A logical citable item of a given kind. The shape of `source_metadata`
/// depends on `source_type`: `document` carries a `document_id`, `url`
/// carries a `url`, `text` carries the raw `content`.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = source)]
pub struct Source {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source_type: SourceType,
    pub source_metadata: serde_json::Value,
    pub status: ProcessingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Source {
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        title: impl Into<String>,
        description: Option<String>,
        source_type: SourceType,
        source_metadata: serde_json::Value,
    ) -> Result<Self, diesel::result::Error> {
        let now = Utc::now().naive_utc();
        diesel::insert_into(source::table)
            .values((
                source::id.eq(Uuid::now_v7()),
                source::owner_id.eq(owner_id),
                source::title.eq(title.into()),
                source::description.eq(description),
                source::source_type.eq(source_type),
                source::source_metadata.eq(source_metadata),
                source::status.eq(ProcessingStatus::Pending),
                source::created_at.eq(now),
                source::updated_at.eq(now),
            ))
            .returning(Source::as_select())
            .get_result(conn)
            .await
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        source::table
            .filter(source::id.eq(id))
            .first(conn)
            .await
            .optional()
    }

    pub async fn get_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        source::table
            .filter(source::id.eq(id))
            .filter(source::owner_id.eq(owner_id))
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        source_type: Option<SourceType>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        let mut query = source::table
            .filter(source::owner_id.eq(owner_id))
            .into_boxed();
        if let Some(kind) = source_type {
            query = query.filter(source::source_type.eq(kind));
        }
        query
            .order(source::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load(conn)
            .await
    }

    pub async fn count_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        source_type: Option<SourceType>,
    ) -> Result<i64, diesel::result::Error> {
        let mut query = source::table
            .filter(source::owner_id.eq(owner_id))
            .into_boxed();
        if let Some(kind) = source_type {
            query = query.filter(source::source_type.eq(kind));
        }
        query.count().get_result(conn).await
    }

    pub async fn update_fields<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
        source_metadata: Option<serde_json::Value>,
    ) -> Result<Self, diesel::result::Error> {
        // Diesel cannot express a dynamic changeset over optional fields
        // without boxing each one, so apply them individually.
        let now = Utc::now().naive_utc();
        if let Some(title) = title {
            diesel::update(source::table)
                .filter(source::id.eq(id))
                .set(source::title.eq(title))
                .execute(conn)
                .await?;
        }
        if let Some(description) = description {
            diesel::update(source::table)
                .filter(source::id.eq(id))
                .set(source::description.eq(description))
                .execute(conn)
                .await?;
        }
        if let Some(metadata) = source_metadata {
            diesel::update(source::table)
                .filter(source::id.eq(id))
                .set(source::source_metadata.eq(metadata))
                .execute(conn)
                .await?;
        }
        diesel::update(source::table)
            .filter(source::id.eq(id))
            .set(source::updated_at.eq(now))
            .returning(Source::as_select())
            .get_result(conn)
            .await
    }

    pub async fn update_status<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
        status: ProcessingStatus,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(source::table)
            .filter(source::id.eq(id))
            .set((
                source::status.eq(status),
                source::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .await
    }

    /// How many notebooks reference this source.
    pub async fn notebook_count<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        notebook_source::table
            .filter(notebook_source::source_id.eq(id))
            .count()
            .get_result(conn)
            .await
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(source::table)
            .filter(source::id.eq(id))
            .execute(conn)
            .await
    }
}
