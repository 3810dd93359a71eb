//! PostgreSQL repository implementation.
//!
//! Runs diesel queries through the shared `nh-db` connection pool and maps
//! the row types into the repository's domain structs.

use async_trait::async_trait;
use uuid::Uuid;

use nh_db::{models, DbPool, ProcessingStatus, SourceType};

use super::{
    error::{RepositoryError, RepositoryResult},
    Document, NewDocument, NewSource, Notebook, NotebookMessage, NotebookSource, Repository,
    Source,
};

pub struct PostgresRepository {
    pool: DbPool,
}

impl PostgresRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> RepositoryResult<nh_db::DbConnection<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| RepositoryError::Pool(e.to_string()))
    }
}

impl From<models::Document> for Document {
    fn from(row: models::Document) -> Self {
        Document {
            id: row.id,
            owner_id: row.owner_id,
            filename: row.filename,
            mime_type: row.mime_type,
            size: row.size,
            bucket: row.bucket,
            object_key: row.object_key,
            metadata: row.metadata,
            status: row.status,
            version: row.version,
            source_id: row.source_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<models::Source> for Source {
    fn from(row: models::Source) -> Self {
        Source {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            source_type: row.source_type,
            source_metadata: row.source_metadata,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<models::Notebook> for Notebook {
    fn from(row: models::Notebook) -> Self {
        Notebook {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<models::NotebookSource> for NotebookSource {
    fn from(row: models::NotebookSource) -> Self {
        NotebookSource {
            id: row.id,
            notebook_id: row.notebook_id,
            source_id: row.source_id,
            position: row.position,
            added_at: row.added_at,
        }
    }
}

impl From<models::NotebookMessage> for NotebookMessage {
    fn from(row: models::NotebookMessage) -> Self {
        let used_sources = row.used_sources.and_then(|value| {
            serde_json::from_value::<Vec<Uuid>>(value).ok()
        });
        NotebookMessage {
            id: row.id,
            notebook_id: row.notebook_id,
            role: row.role,
            content: row.content,
            used_sources,
            created_at: row.created_at,
        }
    }
}

fn map_unique_violation(e: diesel::result::Error, what: &str) -> RepositoryError {
    match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => RepositoryError::Duplicate(what.to_string()),
        other => RepositoryError::Database(other),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // ============ Document operations ============

    async fn create_document(&self, new: NewDocument) -> RepositoryResult<Document> {
        let mut conn = self.conn().await?;
        models::Document::create(
            &mut conn,
            new.owner_id,
            new.filename,
            new.mime_type,
            new.size,
            new.bucket,
            new.object_key,
            new.metadata,
        )
        .await
        .map(Into::into)
        .map_err(|e| map_unique_violation(e, "File already exists"))
    }

    async fn get_document(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Document>> {
        let mut conn = self.conn().await?;
        Ok(models::Document::get_for_owner(&mut conn, owner_id, id)
            .await?
            .map(Into::into))
    }

    async fn get_document_by_object_key(
        &self,
        owner_id: Uuid,
        object_key: &str,
    ) -> RepositoryResult<Option<Document>> {
        let mut conn = self.conn().await?;
        Ok(
            models::Document::get_by_object_key(&mut conn, owner_id, object_key)
                .await?
                .map(Into::into),
        )
    }

    async fn list_documents(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Document>> {
        let mut conn = self.conn().await?;
        Ok(
            models::Document::list_for_owner(&mut conn, owner_id, offset, limit)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        )
    }

    async fn count_documents(&self, owner_id: Uuid) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::Document::count_for_owner(&mut conn, owner_id).await?)
    }

    async fn list_all_documents(&self) -> RepositoryResult<Vec<Document>> {
        let mut conn = self.conn().await?;
        Ok(models::Document::list_all(&mut conn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn find_document_by_object_key(
        &self,
        object_key: &str,
    ) -> RepositoryResult<Option<Document>> {
        let mut conn = self.conn().await?;
        Ok(models::Document::find_by_object_key(&mut conn, object_key)
            .await?
            .map(Into::into))
    }

    async fn count_processing_documents(&self, owner_id: Uuid) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::Document::count_processing_for_owner(&mut conn, owner_id).await?)
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::Document::update_status(&mut conn, id, status).await?;
        Ok(())
    }

    async fn link_document_source(
        &self,
        document_id: Uuid,
        source_id: Option<Uuid>,
    ) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::Document::set_source(&mut conn, document_id, source_id).await?;
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::Document::delete(&mut conn, id).await?;
        Ok(())
    }

    // ============ Source operations ============

    async fn create_source(&self, new: NewSource) -> RepositoryResult<Source> {
        let mut conn = self.conn().await?;
        Ok(models::Source::create(
            &mut conn,
            new.owner_id,
            new.title,
            new.description,
            new.source_type,
            new.source_metadata,
        )
        .await?
        .into())
    }

    async fn get_source(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Source>> {
        let mut conn = self.conn().await?;
        Ok(models::Source::get_for_owner(&mut conn, owner_id, id)
            .await?
            .map(Into::into))
    }

    async fn list_sources(
        &self,
        owner_id: Uuid,
        source_type: Option<SourceType>,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Source>> {
        let mut conn = self.conn().await?;
        Ok(
            models::Source::list_for_owner(&mut conn, owner_id, source_type, offset, limit)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        )
    }

    async fn count_sources(
        &self,
        owner_id: Uuid,
        source_type: Option<SourceType>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::Source::count_for_owner(&mut conn, owner_id, source_type).await?)
    }

    async fn update_source(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
        source_metadata: Option<serde_json::Value>,
    ) -> RepositoryResult<Source> {
        let mut conn = self.conn().await?;
        Ok(
            models::Source::update_fields(&mut conn, id, title, description, source_metadata)
                .await?
                .into(),
        )
    }

    async fn update_source_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::Source::update_status(&mut conn, id, status).await?;
        Ok(())
    }

    async fn delete_source(&self, id: Uuid) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::Source::delete(&mut conn, id).await?;
        Ok(())
    }

    async fn source_notebook_count(&self, id: Uuid) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::Source::notebook_count(&mut conn, id).await?)
    }

    // ============ Notebook operations ============

    async fn create_notebook(
        &self,
        owner_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> RepositoryResult<Notebook> {
        let mut conn = self.conn().await?;
        Ok(
            models::Notebook::create(&mut conn, owner_id, title, description)
                .await?
                .into(),
        )
    }

    async fn get_notebook(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Notebook>> {
        let mut conn = self.conn().await?;
        Ok(models::Notebook::get_for_owner(&mut conn, owner_id, id)
            .await?
            .map(Into::into))
    }

    async fn list_notebooks(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Notebook>> {
        let mut conn = self.conn().await?;
        Ok(
            models::Notebook::list_for_owner(&mut conn, owner_id, offset, limit)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        )
    }

    async fn count_notebooks(&self, owner_id: Uuid) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::Notebook::count_for_owner(&mut conn, owner_id).await?)
    }

    async fn update_notebook(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> RepositoryResult<Notebook> {
        let mut conn = self.conn().await?;
        Ok(
            models::Notebook::update_fields(&mut conn, id, title, description)
                .await?
                .into(),
        )
    }

    async fn delete_notebook(&self, id: Uuid) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::Notebook::delete(&mut conn, id).await?;
        Ok(())
    }

    async fn notebook_source_count(&self, id: Uuid) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::Notebook::source_count(&mut conn, id).await?)
    }

    // ============ Membership operations ============

    async fn get_membership(
        &self,
        notebook_id: Uuid,
        source_id: Uuid,
    ) -> RepositoryResult<Option<NotebookSource>> {
        let mut conn = self.conn().await?;
        Ok(models::NotebookSource::get(&mut conn, notebook_id, source_id)
            .await?
            .map(Into::into))
    }

    async fn insert_membership(
        &self,
        notebook_id: Uuid,
        source_id: Uuid,
        position: Option<i32>,
    ) -> RepositoryResult<NotebookSource> {
        let mut conn = self.conn().await?;
        let position = match position {
            Some(position) => position,
            None => models::NotebookSource::max_position(&mut conn, notebook_id)
                .await?
                .map_or(0, |max| max + 1),
        };
        models::NotebookSource::create(&mut conn, notebook_id, source_id, position)
            .await
            .map(Into::into)
            .map_err(|e| map_unique_violation(e, "Source already in notebook"))
    }

    async fn list_memberships(&self, notebook_id: Uuid) -> RepositoryResult<Vec<NotebookSource>> {
        let mut conn = self.conn().await?;
        Ok(
            models::NotebookSource::list_for_notebook(&mut conn, notebook_id)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        )
    }

    async fn update_membership_position(
        &self,
        id: Uuid,
        position: i32,
    ) -> RepositoryResult<NotebookSource> {
        let mut conn = self.conn().await?;
        Ok(
            models::NotebookSource::update_position(&mut conn, id, position)
                .await?
                .into(),
        )
    }

    async fn delete_membership(&self, id: Uuid) -> RepositoryResult<()> {
        let mut conn = self.conn().await?;
        models::NotebookSource::delete(&mut conn, id).await?;
        Ok(())
    }

    async fn count_other_memberships(
        &self,
        source_id: Uuid,
        notebook_id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::NotebookSource::count_other_notebooks(
            &mut conn,
            source_id,
            notebook_id,
            owner_id,
        )
        .await?)
    }

    // ============ Message operations ============

    async fn create_message(
        &self,
        notebook_id: Uuid,
        role: String,
        content: String,
        used_sources: Option<Vec<Uuid>>,
    ) -> RepositoryResult<NotebookMessage> {
        let mut conn = self.conn().await?;
        let used_sources_json = used_sources
            .map(|ids| serde_json::to_value(ids))
            .transpose()
            .map_err(|e| RepositoryError::Pool(e.to_string()))?;
        Ok(models::NotebookMessage::create(
            &mut conn,
            notebook_id,
            role,
            content,
            used_sources_json,
        )
        .await?
        .into())
    }

    async fn list_messages(
        &self,
        notebook_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<NotebookMessage>> {
        let mut conn = self.conn().await?;
        Ok(
            models::NotebookMessage::list_for_notebook(&mut conn, notebook_id, offset, limit)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        )
    }

    async fn count_messages(&self, notebook_id: Uuid) -> RepositoryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(models::NotebookMessage::count_for_notebook(&mut conn, notebook_id).await?)
    }
}
