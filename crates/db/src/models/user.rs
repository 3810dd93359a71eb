use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{schema::app_user, DbConnection};

/// Identity bearer. Only referenced through `owner_id` foreign keys;
/// account management happens in a separate service.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = app_user)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        app_user::table
            .filter(app_user::id.eq(id))
            .first(conn)
            .await
            .optional()
    }
}
