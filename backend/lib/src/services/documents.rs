//! Document read and delete operations.
//!
//! Deletion is blob-first: the object must leave storage before the row is
//! touched, so a transient storage failure leaves both stores intact. A
//! row-delete failure after a successful blob delete is the one partial
//! state this path can produce; it is logged as an inconsistency marker
//! for the reconciler.

use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use nh_event_bus::{ChangeEvent, EventOp};

use crate::error::{Error, Result};
use crate::models::documents::{
    BatchDeleteResponse, DeleteDocumentResponse, DocumentPublic, DocumentsPublic, PresignResponse,
};
use crate::models::Pagination;
use crate::repository::Document;
use crate::services::{CurrentUser, Services};

/// Event payload snapshot the indexing worker needs to fetch and process
/// the blob without a database read.
pub(crate) fn document_event_metadata(document: &Document) -> serde_json::Value {
    serde_json::json!({
        "filename": document.filename,
        "mime_type": document.mime_type,
        "size": document.size,
        "bucket": document.bucket,
        "object_key": document.object_key,
        "metadata": document.metadata,
    })
}

/// Publishes a document lifecycle event. Non-blocking: failures are logged
/// and swallowed, the relational write stands either way.
pub(crate) async fn publish_document_event(services: &Services, document: &Document, op: EventOp) {
    let event = ChangeEvent::document(
        op,
        document.id,
        document.version,
        document_event_metadata(document),
        document.owner_id,
    );
    if !services.publisher.publish(&event).await {
        warn!(document_id = %document.id, op = ?op, "Failed to publish document event");
    }
}

pub struct DocumentService {
    services: Services,
}

impl DocumentService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn list(&self, user: &CurrentUser, page: Pagination) -> Result<DocumentsPublic> {
        let page = page.clamped();
        let documents = self
            .services
            .repository
            .list_documents(user.id, page.skip, page.limit)
            .await?;
        let count = self.services.repository.count_documents(user.id).await?;
        Ok(DocumentsPublic {
            documents: documents.into_iter().map(DocumentPublic::from).collect(),
            count,
        })
    }

    pub async fn get(&self, user: &CurrentUser, id: Uuid) -> Result<DocumentPublic> {
        let document = self
            .services
            .repository
            .get_document(user.id, id)
            .await?
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;
        Ok(document.into())
    }

    pub async fn presign(
        &self,
        user: &CurrentUser,
        key: &str,
        expires_minutes: u64,
    ) -> Result<PresignResponse> {
        let expires_minutes = expires_minutes.clamp(1, 1440);
        // Keys are namespaced per owner; presigning outside the caller's
        // namespace is indistinguishable from a missing object.
        if !key.starts_with(&format!("{}/", user.id)) {
            return Err(Error::NotFound("Object not found".to_string()));
        }

        let url = self
            .services
            .object_store
            .presigned_get_url(key, Duration::from_secs(expires_minutes * 60))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::NotFound("Object not found".to_string())
                } else {
                    Error::OperationFailed(format!("Failed to generate presigned URL: {e}"))
                }
            })?;

        Ok(PresignResponse {
            url,
            bucket: self.services.object_store.bucket().to_string(),
            key: key.to_string(),
        })
    }
}

pub struct FileDeleteService {
    services: Services,
}

impl FileDeleteService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn delete_document(
        &self,
        user: &CurrentUser,
        document_id: Uuid,
    ) -> Result<DeleteDocumentResponse> {
        let document = self
            .services
            .repository
            .get_document(user.id, document_id)
            .await?
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;

        // Step 1: blob first, fail fast. The row stays authoritative until
        // the object is gone.
        self.services
            .object_store
            .delete(&document.object_key)
            .await
            .map_err(|e| {
                error!(document_id = %document_id, error = %e, "Blob delete failed");
                Error::OperationFailed("Failed to delete document from storage".to_string())
            })?;

        // Step 2: tell the indexing worker to drop the vector points.
        publish_document_event(&self.services, &document, EventOp::Delete).await;

        // Step 3: remove the metadata row.
        if let Err(e) = self.services.repository.delete_document(document.id).await {
            error!(
                document_id = %document_id,
                object_key = %document.object_key,
                error = %e,
                "INCONSISTENT STATE: blob deleted but document row remains"
            );
            return Err(Error::OperationFailed(
                "Failed to delete document".to_string(),
            ));
        }

        info!(document_id = %document_id, user = %user, "Deleted document");
        Ok(DeleteDocumentResponse {
            message: "Document deleted successfully".to_string(),
            document_id,
        })
    }

    pub async fn delete_batch(
        &self,
        user: &CurrentUser,
        document_ids: Vec<Uuid>,
    ) -> Result<BatchDeleteResponse> {
        let total_requested = document_ids.len();
        let mut owned = Vec::new();
        for id in document_ids {
            if self
                .services
                .repository
                .get_document(user.id, id)
                .await?
                .is_some()
            {
                owned.push(id);
            }
        }
        if owned.is_empty() {
            return Err(Error::NotFound("No documents found".to_string()));
        }

        let mut deleted_count = 0;
        let mut failed_deletions = Vec::new();
        for id in owned {
            match self.delete_document(user, id).await {
                Ok(_) => deleted_count += 1,
                Err(e) => failed_deletions.push(format!("Document {id}: {e}")),
            }
        }

        let mut message = format!("Deleted {deleted_count} documents");
        if !failed_deletions.is_empty() {
            message.push_str(&format!(", {} failed", failed_deletions.len()));
        }
        Ok(BatchDeleteResponse {
            message,
            deleted_count,
            total_requested,
            failed_deletions: (!failed_deletions.is_empty()).then_some(failed_deletions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestContext;
    use bytes::Bytes;
    use nh_object_store::ObjectStorage;

    #[tokio::test]
    async fn delete_is_blob_first_and_publishes_delete_event() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let document = ctx
            .upload(&user, "notes.txt", b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check")
            .await
            .unwrap();
        ctx.publisher.take_events();

        let response = FileDeleteService::new(&ctx.services)
            .delete_document(&user, document.id)
            .await
            .unwrap();
        assert_eq!(response.document_id, document.id);

        assert!(!ctx.object_store.contains(&document.object_key));
        assert!(ctx
            .services
            .repository
            .get_document(user.id, document.id)
            .await
            .unwrap()
            .is_none());

        let events = ctx.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].op(), EventOp::Delete);
    }

    #[tokio::test]
    async fn failed_blob_delete_keeps_the_row() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let document = ctx
            .upload(&user, "notes.txt", b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check")
            .await
            .unwrap();

        ctx.object_store.set_fail_deletes(true);
        let err = FileDeleteService::new(&ctx.services)
            .delete_document(&user, document.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OperationFailed(_)));

        // Row and blob both still present: no partial state.
        assert!(ctx.object_store.contains(&document.object_key));
        assert!(ctx
            .services
            .repository
            .get_document(user.id, document.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found_and_changes_nothing() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let document = ctx
            .upload(&user, "notes.txt", b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check")
            .await
            .unwrap();

        let service = FileDeleteService::new(&ctx.services);
        service.delete_document(&user, document.id).await.unwrap();
        let before = ctx.object_store.object_count();

        let err = service.delete_document(&user, document.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(ctx.object_store.object_count(), before);
    }

    #[tokio::test]
    async fn foreign_documents_are_invisible() {
        let ctx = TestContext::new();
        let owner = ctx.user();
        let stranger = ctx.user();
        let document = ctx
            .upload(&owner, "notes.txt", b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check")
            .await
            .unwrap();

        let err = FileDeleteService::new(&ctx.services)
            .delete_document(&stranger, document.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(ctx.object_store.contains(&document.object_key));
    }

    #[tokio::test]
    async fn presign_is_scoped_to_the_callers_namespace() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let stranger = ctx.user();
        ctx.object_store
            .put(
                &format!("{}/notes.txt", user.id),
                Bytes::from_static(b"data"),
                "text/plain",
            )
            .await
            .unwrap();

        let service = DocumentService::new(&ctx.services);
        let ok = service
            .presign(&user, &format!("{}/notes.txt", user.id), 60)
            .await
            .unwrap();
        assert!(ok.url.contains("notes.txt"));

        let err = service
            .presign(&stranger, &format!("{}/notes.txt", user.id), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
