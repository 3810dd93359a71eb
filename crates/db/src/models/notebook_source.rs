use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{
    schema::{notebook, notebook_source},
    DbConnection,
};

/// M:N membership between notebooks and sources, ordered by `position`.
/// `(notebook_id, source_id)` is unique; attaching an already-attached
/// source is handled as an idempotent no-op above this layer.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = notebook_source)]
pub struct NotebookSource {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub source_id: Uuid,
    pub position: i32,
    pub added_at: NaiveDateTime,
}

impl NotebookSource {
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
        source_id: Uuid,
        position: i32,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(notebook_source::table)
            .values((
                notebook_source::id.eq(Uuid::now_v7()),
                notebook_source::notebook_id.eq(notebook_id),
                notebook_source::source_id.eq(source_id),
                notebook_source::position.eq(position),
                notebook_source::added_at.eq(Utc::now().naive_utc()),
            ))
            .returning(NotebookSource::as_select())
            .get_result(conn)
            .await
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
        source_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        notebook_source::table
            .filter(notebook_source::notebook_id.eq(notebook_id))
            .filter(notebook_source::source_id.eq(source_id))
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_notebook<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        notebook_source::table
            .filter(notebook_source::notebook_id.eq(notebook_id))
            .order(notebook_source::position.asc())
            .load(conn)
            .await
    }

    pub async fn max_position<'a>(
        conn: &mut DbConnection<'a>,
        notebook_id: Uuid,
    ) -> Result<Option<i32>, diesel::result::Error> {
        notebook_source::table
            .filter(notebook_source::notebook_id.eq(notebook_id))
            .select(diesel::dsl::max(notebook_source::position))
            .get_result(conn)
            .await
    }

    pub async fn update_position<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
        position: i32,
    ) -> Result<Self, diesel::result::Error> {
        diesel::update(notebook_source::table)
            .filter(notebook_source::id.eq(id))
            .set(notebook_source::position.eq(position))
            .returning(NotebookSource::as_select())
            .get_result(conn)
            .await
    }

    /// Count of memberships of `source_id` in notebooks other than
    /// `notebook_id` that belong to `owner_id`. Zero means the source will
    /// be orphaned when that notebook goes away.
    pub async fn count_other_notebooks<'a>(
        conn: &mut DbConnection<'a>,
        source_id: Uuid,
        notebook_id: Uuid,
        owner_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        notebook_source::table
            .inner_join(notebook::table)
            .filter(notebook_source::source_id.eq(source_id))
            .filter(notebook_source::notebook_id.ne(notebook_id))
            .filter(notebook::owner_id.eq(owner_id))
            .count()
            .get_result(conn)
            .await
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(notebook_source::table)
            .filter(notebook_source::id.eq(id))
            .execute(conn)
            .await
    }
}
