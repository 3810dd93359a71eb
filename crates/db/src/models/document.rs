use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{schema::document, DbConnection, ProcessingStatus};

/// An uploaded binary blob. The content lives in the object store at
/// `(bucket, object_key)`; this row is the metadata of record.
///
/// `(owner_id, object_key)` is unique, which is what makes uploads
/// idempotent: a second upload of the same filename by the same owner is a
/// conflict, not a new row.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = document)]
pub struct Document {
    pub id: Uuid,
    /// Owner of the document. All reads are scoped by this column.
    pub owner_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub bucket: String,
    pub object_key: String,
    /// Free-form JSON: original filename, upload timestamp, sha-256 hash.
    pub metadata: serde_json::Value,
    pub status: ProcessingStatus,
    pub version: i32,
    /// Back-link to the owning source, set when a `document` source wraps
    /// this row.
    pub source_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Document {
    #[allow(clippy::too_many_arguments)]
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        size: i64,
        bucket: impl Into<String>,
        object_key: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<Self, diesel::result::Error> {
        let now = Utc::now().naive_utc();
        diesel::insert_into(document::table)
            .values((
                document::id.eq(Uuid::now_v7()),
                document::owner_id.eq(owner_id),
                document::filename.eq(filename.into()),
                document::mime_type.eq(mime_type.into()),
                document::size.eq(size),
                document::bucket.eq(bucket.into()),
                document::object_key.eq(object_key.into()),
                document::metadata.eq(metadata),
                document::status.eq(ProcessingStatus::Pending),
                document::version.eq(1),
                document::source_id.eq(None::<Uuid>),
                document::created_at.eq(now),
                document::updated_at.eq(now),
            ))
            .returning(Document::as_select())
            .get_result(conn)
            .await
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        document::table
            .filter(document::id.eq(id))
            .first(conn)
            .await
            .optional()
    }

    /// Ownership-scoped lookup. Absent and not-owned are indistinguishable.
    pub async fn get_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        document::table
            .filter(document::id.eq(id))
            .filter(document::owner_id.eq(owner_id))
            .first(conn)
            .await
            .optional()
    }

    pub async fn get_by_object_key<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
        object_key: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        document::table
            .filter(document::owner_id.eq(owner_id))
            .filter(document::object_key.eq(object_key))
            .first(conn)
            .await
            .optional()
    }

    /// Unscoped object-key lookup, used by the reconciler to match blobs
    /// against rows.
    pub async fn find_by_object_key<'a>(
        conn: &mut DbConnection<'a>,
        object_key: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        document::table
            .filter(document::object_key.eq(object_key))
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
        document::table
            .filter(document::owner_id.eq(owner_id))
            .order(document::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load(conn)
            .await
    }

    pub async fn list_all<'a>(
        conn: &mut DbConnection<'a>,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        document::table.order(document::created_at.asc()).load(conn).await
    }

    pub async fn count_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        document::table
            .filter(document::owner_id.eq(owner_id))
            .count()
            .get_result(conn)
            .await
    }

    /// Number of this owner's documents currently in `processing`, the
    /// live count behind the per-user concurrency gate.
    pub async fn count_processing_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        document::table
            .filter(document::owner_id.eq(owner_id))
            .filter(document::status.eq(ProcessingStatus::Processing))
            .count()
            .get_result(conn)
            .await
    }

    pub async fn update_status<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
        status: ProcessingStatus,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(document::table)
            .filter(document::id.eq(id))
            .set((
                document::status.eq(status),
                document::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .await
    }

    pub async fn set_source<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
        source_id: Option<Uuid>,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(document::table)
            .filter(document::id.eq(id))
            .set((
                document::source_id.eq(source_id),
                document::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .await
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(document::table)
            .filter(document::id.eq(id))
            .execute(conn)
            .await
    }
}
