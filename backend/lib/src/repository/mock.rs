//! In-memory repository for tests.
//!
//! Mirrors the relational semantics the services rely on: unique
//! constraints surface as `Duplicate`, junction rows and messages are
//! removed with their parent rows, and listings are ordered the same way
//! the SQL queries order them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    error::{RepositoryError, RepositoryResult},
    Document, NewDocument, NewSource, Notebook, NotebookMessage, NotebookSource, ProcessingStatus,
    Repository, Source, SourceType,
};

#[derive(Default)]
pub struct MockRepository {
    documents: Mutex<HashMap<Uuid, Document>>,
    sources: Mutex<HashMap<Uuid, Source>>,
    notebooks: Mutex<HashMap<Uuid, Notebook>>,
    memberships: Mutex<HashMap<Uuid, NotebookSource>>,
    messages: Mutex<HashMap<Uuid, NotebookMessage>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(what: &str) -> RepositoryError {
        RepositoryError::Pool(format!("{what} not found"))
    }
}

#[async_trait]
impl Repository for MockRepository {
    // ============ Document operations ============

    async fn create_document(&self, new: NewDocument) -> RepositoryResult<Document> {
        let mut documents = self.documents.lock();
        let duplicate = documents
            .values()
            .any(|d| d.owner_id == new.owner_id && d.object_key == new.object_key);
        if duplicate {
            return Err(RepositoryError::Duplicate("File already exists".into()));
        }

        let now = Utc::now().naive_utc();
        let document = Document {
            id: Uuid::now_v7(),
            owner_id: new.owner_id,
            filename: new.filename,
            mime_type: new.mime_type,
            size: new.size,
            bucket: new.bucket,
            object_key: new.object_key,
            metadata: new.metadata,
            status: ProcessingStatus::Pending,
            version: 1,
            source_id: None,
            created_at: now,
            updated_at: now,
        };
        documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .get(&id)
            .filter(|d| d.owner_id == owner_id)
            .cloned())
    }

    async fn get_document_by_object_key(
        &self,
        owner_id: Uuid,
        object_key: &str,
    ) -> RepositoryResult<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .values()
            .find(|d| d.owner_id == owner_id && d.object_key == object_key)
            .cloned())
    }

    async fn list_documents(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .lock()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(documents
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_documents(&self, owner_id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .documents
            .lock()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .count() as i64)
    }

    async fn list_all_documents(&self) -> RepositoryResult<Vec<Document>> {
        let mut documents: Vec<Document> = self.documents.lock().values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(documents)
    }

    async fn find_document_by_object_key(
        &self,
        object_key: &str,
    ) -> RepositoryResult<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .values()
            .find(|d| d.object_key == object_key)
            .cloned())
    }

    async fn count_processing_documents(&self, owner_id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .documents
            .lock()
            .values()
            .filter(|d| d.owner_id == owner_id && d.status == ProcessingStatus::Processing)
            .count() as i64)
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> RepositoryResult<()> {
        let mut documents = self.documents.lock();
        let document = documents.get_mut(&id).ok_or_else(|| Self::not_found("document"))?;
        document.status = status;
        document.updated_at = Utc::now().naive_utc();
        Ok(())
    }

    async fn link_document_source(
        &self,
        document_id: Uuid,
        source_id: Option<Uuid>,
    ) -> RepositoryResult<()> {
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(&document_id)
            .ok_or_else(|| Self::not_found("document"))?;
        document.source_id = source_id;
        document.updated_at = Utc::now().naive_utc();
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> RepositoryResult<()> {
        self.documents.lock().remove(&id);
        Ok(())
    }

    // ============ Source operations ============

    async fn create_source(&self, new: NewSource) -> RepositoryResult<Source> {
        let now = Utc::now().naive_utc();
        let source = Source {
            id: Uuid::now_v7(),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            source_type: new.source_type,
            source_metadata: new.source_metadata,
            status: ProcessingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.sources.lock().insert(source.id, source.clone());
        Ok(source)
    }

    async fn get_source(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Source>> {
        Ok(self
            .sources
            .lock()
            .get(&id)
            .filter(|s| s.owner_id == owner_id)
            .cloned())
    }

    async fn list_sources(
        &self,
        owner_id: Uuid,
        source_type: Option<SourceType>,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Source>> {
        let mut sources: Vec<Source> = self
            .sources
            .lock()
            .values()
            .filter(|s| s.owner_id == owner_id)
            .filter(|s| source_type.map_or(true, |t| s.source_type == t))
            .cloned()
            .collect();
        sources.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sources
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_sources(
        &self,
        owner_id: Uuid,
        source_type: Option<SourceType>,
    ) -> RepositoryResult<i64> {
        Ok(self
            .sources
            .lock()
            .values()
            .filter(|s| s.owner_id == owner_id)
            .filter(|s| source_type.map_or(true, |t| s.source_type == t))
            .count() as i64)
    }

    async fn update_source(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
        source_metadata: Option<serde_json::Value>,
    ) -> RepositoryResult<Source> {
        let mut sources = self.sources.lock();
        let source = sources.get_mut(&id).ok_or_else(|| Self::not_found("source"))?;
        if let Some(title) = title {
            source.title = title;
        }
        if let Some(description) = description {
            source.description = Some(description);
        }
        if let Some(metadata) = source_metadata {
            source.source_metadata = metadata;
        }
        source.updated_at = Utc::now().naive_utc();
        Ok(source.clone())
    }

    async fn update_source_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> RepositoryResult<()> {
        let mut sources = self.sources.lock();
        let source = sources.get_mut(&id).ok_or_else(|| Self::not_found("source"))?;
        source.status = status;
        source.updated_at = Utc::now().naive_utc();
        Ok(())
    }

    async fn delete_source(&self, id: Uuid) -> RepositoryResult<()> {
        self.sources.lock().remove(&id);
        // FK cascade: junction rows vanish with the source.
        self.memberships.lock().retain(|_, m| m.source_id != id);
        Ok(())
    }

    async fn source_notebook_count(&self, id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .memberships
            .lock()
            .values()
            .filter(|m| m.source_id == id)
            .count() as i64)
    }

    // ============ Notebook operations ============

    async fn create_notebook(
        &self,
        owner_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> RepositoryResult<Notebook> {
        let now = Utc::now().naive_utc();
        let notebook = Notebook {
            id: Uuid::now_v7(),
            owner_id,
            title,
            description,
            created_at: now,
            updated_at: now,
        };
        self.notebooks.lock().insert(notebook.id, notebook.clone());
        Ok(notebook)
    }

    async fn get_notebook(&self, owner_id: Uuid, id: Uuid) -> RepositoryResult<Option<Notebook>> {
        Ok(self
            .notebooks
            .lock()
            .get(&id)
            .filter(|n| n.owner_id == owner_id)
            .cloned())
    }

    async fn list_notebooks(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Notebook>> {
        let mut notebooks: Vec<Notebook> = self
            .notebooks
            .lock()
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        notebooks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(notebooks
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_notebooks(&self, owner_id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .notebooks
            .lock()
            .values()
            .filter(|n| n.owner_id == owner_id)
            .count() as i64)
    }

    async fn update_notebook(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> RepositoryResult<Notebook> {
        let mut notebooks = self.notebooks.lock();
        let notebook = notebooks.get_mut(&id).ok_or_else(|| Self::not_found("notebook"))?;
        if let Some(title) = title {
            notebook.title = title;
        }
        if let Some(description) = description {
            notebook.description = Some(description);
        }
        notebook.updated_at = Utc::now().naive_utc();
        Ok(notebook.clone())
    }

    async fn delete_notebook(&self, id: Uuid) -> RepositoryResult<()> {
        self.notebooks.lock().remove(&id);
        // FK cascade: junction rows and messages vanish with the notebook.
        self.memberships.lock().retain(|_, m| m.notebook_id != id);
        self.messages.lock().retain(|_, m| m.notebook_id != id);
        Ok(())
    }

    async fn notebook_source_count(&self, id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .memberships
            .lock()
            .values()
            .filter(|m| m.notebook_id == id)
            .count() as i64)
    }

    // ============ Membership operations ============

    async fn get_membership(
        &self,
        notebook_id: Uuid,
        source_id: Uuid,
    ) -> RepositoryResult<Option<NotebookSource>> {
        Ok(self
            .memberships
            .lock()
            .values()
            .find(|m| m.notebook_id == notebook_id && m.source_id == source_id)
            .cloned())
    }

    async fn insert_membership(
        &self,
        notebook_id: Uuid,
        source_id: Uuid,
        position: Option<i32>,
    ) -> RepositoryResult<NotebookSource> {
        let mut memberships = self.memberships.lock();
        let duplicate = memberships
            .values()
            .any(|m| m.notebook_id == notebook_id && m.source_id == source_id);
        if duplicate {
            return Err(RepositoryError::Duplicate("Source already in notebook".into()));
        }

        let position = position.unwrap_or_else(|| {
            memberships
                .values()
                .filter(|m| m.notebook_id == notebook_id)
                .map(|m| m.position)
                .max()
                .map_or(0, |max| max + 1)
        });
        let membership = NotebookSource {
            id: Uuid::now_v7(),
            notebook_id,
            source_id,
            position,
            added_at: Utc::now().naive_utc(),
        };
        memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn list_memberships(&self, notebook_id: Uuid) -> RepositoryResult<Vec<NotebookSource>> {
        let mut memberships: Vec<NotebookSource> = self
            .memberships
            .lock()
            .values()
            .filter(|m| m.notebook_id == notebook_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| m.position);
        Ok(memberships)
    }

    async fn update_membership_position(
        &self,
        id: Uuid,
        position: i32,
    ) -> RepositoryResult<NotebookSource> {
        let mut memberships = self.memberships.lock();
        let membership = memberships
            .get_mut(&id)
            .ok_or_else(|| Self::not_found("membership"))?;
        membership.position = position;
        Ok(membership.clone())
    }

    async fn delete_membership(&self, id: Uuid) -> RepositoryResult<()> {
        self.memberships.lock().remove(&id);
        Ok(())
    }

    async fn count_other_memberships(
        &self,
        source_id: Uuid,
        notebook_id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<i64> {
        let notebooks = self.notebooks.lock();
        Ok(self
            .memberships
            .lock()
            .values()
            .filter(|m| m.source_id == source_id && m.notebook_id != notebook_id)
            .filter(|m| {
                notebooks
                    .get(&m.notebook_id)
                    .map_or(false, |n| n.owner_id == owner_id)
            })
            .count() as i64)
    }

    // ============ Message operations ============

    async fn create_message(
        &self,
        notebook_id: Uuid,
        role: String,
        content: String,
        used_sources: Option<Vec<Uuid>>,
    ) -> RepositoryResult<NotebookMessage> {
        let message = NotebookMessage {
            id: Uuid::now_v7(),
            notebook_id,
            role,
            content,
            used_sources,
            created_at: Utc::now().naive_utc(),
        };
        self.messages.lock().insert(message.id, message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        notebook_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<NotebookMessage>> {
        let mut messages: Vec<NotebookMessage> = self
            .messages
            .lock()
            .values()
            .filter(|m| m.notebook_id == notebook_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_messages(&self, notebook_id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .messages
            .lock()
            .values()
            .filter(|m| m.notebook_id == notebook_id)
            .count() as i64)
    }
}
