//! Transactional file upload path.
//!
//! Order of operations per file: validate, gate, idempotency check, PUT
//! the blob, INSERT the row, publish the change event. The blob goes first
//! so a failed insert can always roll it back; the short window where a
//! blob exists without a committed row is swept by the reconciler. Each
//! file of a batch is processed independently and failures are collected,
//! never fatal to the batch.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use nh_event_bus::EventOp;

use crate::api::validation::{bytes_to_human_readable, extension_of, validate_file_type};
use crate::error::{Error, Result};
use crate::models::documents::{DocumentPublic, UploadResponse};
use crate::repository::{Document, NewDocument};
use crate::services::documents::publish_document_event;
use crate::services::{CurrentUser, Services};

/// One file extracted from the multipart request.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

pub struct FileUploadService {
    services: Services,
}

impl FileUploadService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn upload_file(&self, user: &CurrentUser, file: UploadedFile) -> Result<Document> {
        let filename = file.filename.trim().to_string();
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return Err(Error::BadRequest(format!("Invalid filename: {filename}")));
        }
        if file.bytes.is_empty() {
            return Err(Error::BadRequest(format!("Empty file: {filename}")));
        }

        let config = &self.services.config;
        validate_file_type(
            &filename,
            file.content_type.as_deref(),
            &config.limits.allowed_file_types,
        )?;

        let extension = extension_of(&filename);
        let size_limit = config.size_limit_for(&extension);
        if file.bytes.len() > size_limit {
            return Err(Error::PayloadTooLarge(format!(
                "File '{filename}' ({}) exceeds maximum size of {} for {} files",
                bytes_to_human_readable(file.bytes.len()),
                bytes_to_human_readable(size_limit),
                extension.to_uppercase(),
            )));
        }
        if file.bytes.len() < config.limits.min_file_size_bytes {
            return Err(Error::BadRequest(format!(
                "File '{filename}' ({}) is too small (minimum {})",
                bytes_to_human_readable(file.bytes.len()),
                bytes_to_human_readable(config.limits.min_file_size_bytes),
            )));
        }

        let can_process = self
            .services
            .rate_limiter
            .check_processing_limit(user.id)
            .await?;
        if !can_process {
            return Err(Error::RateLimited(format!(
                "Processing limit exceeded. You have {} files currently being processed. \
                 Please wait for some to complete.",
                self.services.rate_limiter.max_concurrent_processing(),
            )));
        }

        let object_key = format!("{}/{}", user.id, filename);
        if self
            .services
            .repository
            .get_document_by_object_key(user.id, &object_key)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("File already exists".to_string()));
        }

        let file_hash = format!("{:x}", Sha256::digest(&file.bytes));
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let metadata = serde_json::json!({
            "original_filename": filename,
            "upload_timestamp": chrono::Utc::now().to_rfc3339(),
            "file_hash": file_hash,
        });

        // Blob first: a failed insert can always undo a PUT, the reverse
        // would leave a committed row pointing at nothing.
        self.services
            .object_store
            .put(&object_key, file.bytes.clone(), &content_type)
            .await
            .map_err(|e| {
                Error::ExternalUnavailable(format!("Failed to upload {filename}: {e}"))
            })?;

        let new_document = NewDocument {
            owner_id: user.id,
            filename: filename.clone(),
            mime_type: content_type,
            size: file.bytes.len() as i64,
            bucket: self.services.object_store.bucket().to_string(),
            object_key: object_key.clone(),
            metadata,
        };

        let document = match self.services.repository.create_document(new_document).await {
            Ok(document) => document,
            Err(e) if e.is_duplicate() => {
                // Lost an insert race with a concurrent upload of the same
                // key; that upload's blob is identical, ours is redundant.
                warn!(object_key = %object_key, "Duplicate file upload attempted");
                self.cleanup_blob(&object_key).await;
                return Err(Error::Conflict("File already exists".to_string()));
            }
            Err(e) => {
                self.cleanup_blob(&object_key).await;
                return Err(Error::OperationFailed(format!(
                    "Failed to upload {filename}: {e}"
                )));
            }
        };

        publish_document_event(&self.services, &document, EventOp::Create).await;

        info!(document_id = %document.id, user = %user, filename = %document.filename, "Uploaded document");
        Ok(document)
    }

    async fn cleanup_blob(&self, object_key: &str) {
        match self.services.object_store.delete(object_key).await {
            Ok(()) => info!(object_key = %object_key, "Cleaned up orphaned blob"),
            Err(e) => {
                warn!(object_key = %object_key, error = %e, "Failed to clean up orphaned blob")
            }
        }
    }

    /// Uploads each file independently; per-file failures are reported as
    /// `"{filename}: {reason}"` alongside the successes.
    pub async fn upload_batch(
        &self,
        user: &CurrentUser,
        files: Vec<UploadedFile>,
    ) -> Result<UploadResponse> {
        let total_size: usize = files.iter().map(|f| f.bytes.len()).sum();
        if total_size > self.services.config.limits.max_total_upload_size_bytes {
            return Err(Error::PayloadTooLarge(format!(
                "Upload batch ({}) exceeds the total limit of {}",
                bytes_to_human_readable(total_size),
                bytes_to_human_readable(self.services.config.limits.max_total_upload_size_bytes),
            )));
        }

        let mut documents: Vec<DocumentPublic> = Vec::new();
        let mut failed_uploads: Vec<String> = Vec::new();

        for file in files {
            let filename = file.filename.clone();
            match self.upload_file(user, file).await {
                Ok(document) => documents.push(document.into()),
                Err(e) => failed_uploads.push(format!("{filename}: {e}")),
            }
        }

        let message = if failed_uploads.is_empty() {
            format!("Successfully uploaded {} files", documents.len())
        } else {
            format!(
                "Uploaded {} files, {} failed",
                documents.len(),
                failed_uploads.len()
            )
        };

        Ok(UploadResponse {
            documents,
            failed_uploads: (!failed_uploads.is_empty()).then_some(failed_uploads),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repository::ProcessingStatus;
    use crate::test_utils::TestContext;

    const BODY: &[u8] =
        b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check";

    fn file(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[tokio::test]
    async fn upload_writes_blob_row_and_event() {
        let ctx = TestContext::new();
        let user = ctx.user();

        let document = ctx.upload(&user, "notes.txt", BODY).await.unwrap();
        assert_eq!(document.status, ProcessingStatus::Pending);
        assert_eq!(document.object_key, format!("{}/notes.txt", user.id));
        assert!(ctx.object_store.contains(&document.object_key));

        let file_hash = document.metadata["file_hash"].as_str().unwrap();
        assert_eq!(file_hash.len(), 64);

        let events = ctx.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].op(), EventOp::Create);
        assert_eq!(events[0].key(), document.id.to_string());
    }

    #[tokio::test]
    async fn duplicate_upload_conflicts_and_keeps_one_blob() {
        let ctx = TestContext::new();
        let user = ctx.user();

        ctx.upload(&user, "notes.txt", BODY).await.unwrap();
        let err = ctx.upload(&user, "notes.txt", BODY).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(err.to_string(), "File already exists");

        assert_eq!(ctx.object_store.object_count(), 1);
        assert_eq!(ctx.services.repository.count_documents(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn size_boundaries_are_inclusive_at_the_limit() {
        let mut config = Config::default();
        config.auth.secret = "test-secret".into();
        config.limits.max_txt_size_bytes = 256;
        config.limits.min_file_size_bytes = 100;
        let ctx = TestContext::with_config(config);
        let user = ctx.user();

        // Exactly at the cap: accepted.
        ctx.upload(&user, "exact.txt", &vec![b'a'; 256]).await.unwrap();

        // One byte over: rejected with 413.
        let err = ctx.upload(&user, "over.txt", &vec![b'a'; 257]).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge(_)));

        // Below the minimum: rejected with 400.
        let err = ctx.upload(&user, "tiny.txt", &vec![b'a'; 99]).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        // Exactly at the minimum: accepted.
        ctx.upload(&user, "small.txt", &vec![b'a'; 100]).await.unwrap();
    }

    #[tokio::test]
    async fn disallowed_types_are_rejected_before_any_write() {
        let ctx = TestContext::new();
        let user = ctx.user();

        let err = FileUploadService::new(&ctx.services)
            .upload_file(&user, file("malware.exe", BODY))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(ctx.object_store.object_count(), 0);
        assert!(ctx.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn gate_rejects_when_user_is_at_processing_capacity() {
        let ctx = TestContext::new();
        let user = ctx.user();

        // Fill the processing budget (default cap is 5).
        for i in 0..5 {
            let document = ctx
                .upload(&user, &format!("doc-{i}.txt"), BODY)
                .await
                .unwrap();
            ctx.services
                .repository
                .update_document_status(document.id, ProcessingStatus::Processing)
                .await
                .unwrap();
        }

        let err = ctx.upload(&user, "one-too-many.txt", BODY).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
        assert!(err.to_string().contains('5'));

        // Another user is unaffected.
        let other = ctx.user();
        ctx.upload(&other, "fine.txt", BODY).await.unwrap();
    }

    #[tokio::test]
    async fn failed_blob_put_leaves_no_row() {
        let ctx = TestContext::new();
        let user = ctx.user();
        ctx.object_store.set_fail_puts(true);

        let err = ctx.upload(&user, "notes.txt", BODY).await.unwrap_err();
        assert!(matches!(err, Error::ExternalUnavailable(_)));
        assert_eq!(ctx.services.repository.count_documents(user.id).await.unwrap(), 0);
        assert!(ctx.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn batch_upload_reports_partial_failures() {
        let ctx = TestContext::new();
        let user = ctx.user();
        ctx.upload(&user, "dup.txt", BODY).await.unwrap();
        ctx.publisher.take_events();

        let response = FileUploadService::new(&ctx.services)
            .upload_batch(
                &user,
                vec![
                    file("ok.txt", BODY),
                    file("dup.txt", BODY),
                    file("bad.exe", BODY),
                ],
            )
            .await
            .unwrap();

        assert_eq!(response.documents.len(), 1);
        let failed = response.failed_uploads.unwrap();
        assert_eq!(failed.len(), 2);
        assert!(failed[0].starts_with("dup.txt: File already exists"));
        assert_eq!(response.message, "Uploaded 1 files, 2 failed");
        assert_eq!(ctx.publisher.events().len(), 1);
    }
}
