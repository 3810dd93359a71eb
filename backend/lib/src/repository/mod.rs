//! Repository pattern over the metadata database.
//!
//! Services talk to an [`Repository`] trait object; the production
//! implementation runs diesel queries through a connection pool, the mock
//! keeps everything in memory so handler and service tests need no
//! database.

pub mod error;
pub mod mock;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

pub use error::{RepositoryError, RepositoryResult};
pub use mock::MockRepository;
pub use postgres::PostgresRepository;

pub use nh_db::{ProcessingStatus, SourceType};

#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub bucket: String,
    pub object_key: String,
    pub metadata: serde_json::Value,
    pub status: ProcessingStatus,
    pub version: i32,
    pub source_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub bucket: String,
    pub object_key: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
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

#[derive(Debug, Clone)]
pub struct NewSource {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source_type: SourceType,
    pub source_metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Notebook {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NotebookSource {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub source_id: Uuid,
    pub position: i32,
    pub added_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NotebookMessage {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub role: String,
    pub content: String,
    pub used_sources: Option<Vec<Uuid>>,
    pub created_at: NaiveDateTime,
}

/// All metadata-database operations the backend needs.
///
/// Every read that acts on behalf of a user is scoped by `owner_id`; an
/// absent row and a row owned by someone else are indistinguishable to the
/// caller.
#[async_trait]
pub trait Repository: Send + Sync {
    // ============ Document operations ============

    /// Inserts a document row in `pending` state. A `(owner_id,
    /// object_key)` collision surfaces as [`RepositoryError::Duplicate`].
    async fn create_document(&self, new: NewDocument) -> RepositoryResult<Document>;

    async fn get_document(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Document>>;

    async fn get_document_by_object_key(
        &self,
        owner_id: Uuid,
        object_key: &str,
    ) -> RepositoryResult<Option<Document>>;

    async fn list_documents(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Document>>;

    async fn count_documents(&self, owner_id: Uuid) -> RepositoryResult<i64>;

    /// Owner-independent scan, used by the reconciler only.
    async fn list_all_documents(&self) -> RepositoryResult<Vec<Document>>;

    /// Owner-independent key lookup, used by the reconciler only.
    async fn find_document_by_object_key(
        &self,
        object_key: &str,
    ) -> RepositoryResult<Option<Document>>;

    async fn count_processing_documents(&self, owner_id: Uuid) -> RepositoryResult<i64>;

    async fn update_document_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> RepositoryResult<()>;

    async fn link_document_source(
        &self,
        document_id: Uuid,
        source_id: Option<Uuid>,
    ) -> RepositoryResult<()>;

    async fn delete_document(&self, id: Uuid) -> RepositoryResult<()>;

    // ============ Source operations ============

    async fn create_source(&self, new: NewSource) -> RepositoryResult<Source>;

    async fn get_source(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Source>>;

    async fn list_sources(
        &self,
        owner_id: Uuid,
        source_type: Option<SourceType>,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Source>>;

    async fn count_sources(
        &self,
        owner_id: Uuid,
        source_type: Option<SourceType>,
    ) -> RepositoryResult<i64>;

    async fn update_source(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
        source_metadata: Option<serde_json::Value>,
    ) -> RepositoryResult<Source>;

    async fn update_source_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> RepositoryResult<()>;

    /// Deletes the source row; junction rows go with it.
    async fn delete_source(&self, id: Uuid) -> RepositoryResult<()>;

    async fn source_notebook_count(&self, id: Uuid) -> RepositoryResult<i64>;

    // ============ Notebook operations ============

    async fn create_notebook(
        &self,
        owner_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> RepositoryResult<Notebook>;

    async fn get_notebook(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Notebook>>;

    async fn list_notebooks(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Notebook>>;

    async fn count_notebooks(&self, owner_id: Uuid) -> RepositoryResult<i64>;

    async fn update_notebook(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> RepositoryResult<Notebook>;

    /// Deletes the notebook row; junction rows and messages go with it.
    async fn delete_notebook(&self, id: Uuid) -> RepositoryResult<()>;

    async fn notebook_source_count(&self, id: Uuid) -> RepositoryResult<i64>;

    // ============ Membership operations ============

    async fn get_membership(
        &self,
        notebook_id: Uuid,
        source_id: Uuid,
    ) -> RepositoryResult<Option<NotebookSource>>;

    /// Inserts a membership row. When `position` is `None` the row is
    /// appended at `max(position) + 1` within the notebook.
    async fn insert_membership(
        &self,
        notebook_id: Uuid,
        source_id: Uuid,
        position: Option<i32>,
    ) -> RepositoryResult<NotebookSource>;

    async fn list_memberships(&self, notebook_id: Uuid) -> RepositoryResult<Vec<NotebookSource>>;

    async fn update_membership_position(
        &self,
        id: Uuid,
        position: i32,
    ) -> RepositoryResult<NotebookSource>;

    async fn delete_membership(&self, id: Uuid) -> RepositoryResult<()>;

    /// Memberships of `source_id` in *other* notebooks of the same owner.
    /// Zero means deleting `notebook_id` orphans the source.
    async fn count_other_memberships(
        &self,
        source_id: Uuid,
        notebook_id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<i64>;

    // ============ Message operations ============

    async fn create_message(
        &self,
        notebook_id: Uuid,
        role: String,
        content: String,
        used_sources: Option<Vec<Uuid>>,
    ) -> RepositoryResult<NotebookMessage>;

    async fn list_messages(
        &self,
        notebook_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<NotebookMessage>>;

    async fn count_messages(&self, notebook_id: Uuid) -> RepositoryResult<i64>;
}
