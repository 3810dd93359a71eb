//! Cross-store reconciliation.
//!
//! There is no transaction spanning the relational store, the blob store
//! and the vector store; every write path can leave a one-sided residue
//! when it dies between stores. This sweeper is the single authority for
//! repairing that drift: it detects blobs without rows and rows without
//! blobs, reports them, and (outside dry-run) removes them. It runs on a
//! schedule and on demand from the superuser endpoints.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::services::Services;

#[derive(Debug, Clone, Serialize)]
pub struct OrphanedObject {
    pub object_key: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanedRecord {
    pub document_id: Uuid,
    pub object_key: String,
    pub filename: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConsistencyReport {
    pub is_consistent: bool,
    pub orphaned_object_count: usize,
    pub orphaned_record_count: usize,
    pub orphaned_objects: Vec<OrphanedObject>,
    pub orphaned_records: Vec<OrphanedRecord>,
}

#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub message: String,
    pub deleted_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FullCleanupReport {
    pub consistency: ConsistencyReport,
    pub orphaned_objects: CleanupReport,
    pub orphaned_records: CleanupReport,
}

pub struct ReconcilerService {
    services: Services,
}

impl ReconcilerService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    /// One listing pass over both stores, diffed in both directions.
    async fn scan(&self) -> Result<(Vec<OrphanedObject>, Vec<OrphanedRecord>)> {
        let objects = self
            .services
            .object_store
            .list(None)
            .await
            .map_err(|e| crate::error::Error::ExternalUnavailable(e.to_string()))?;
        let documents = self.services.repository.list_all_documents().await?;

        let known_keys: HashSet<&str> =
            documents.iter().map(|d| d.object_key.as_str()).collect();
        let stored_keys: HashMap<&str, i64> =
            objects.iter().map(|o| (o.key.as_str(), o.size)).collect();

        let orphaned_objects: Vec<OrphanedObject> = objects
            .iter()
            .filter(|o| !known_keys.contains(o.key.as_str()))
            .map(|o| {
                warn!(object_key = %o.key, "Found orphaned blob");
                OrphanedObject {
                    object_key: o.key.clone(),
                    size: o.size,
                }
            })
            .collect();

        let orphaned_records: Vec<OrphanedRecord> = documents
            .iter()
            .filter(|d| !stored_keys.contains_key(d.object_key.as_str()))
            .map(|d| {
                warn!(document_id = %d.id, object_key = %d.object_key, "Found orphaned document row");
                OrphanedRecord {
                    document_id: d.id,
                    object_key: d.object_key.clone(),
                    filename: d.filename.clone(),
                    owner_id: d.owner_id,
                }
            })
            .collect();

        Ok((orphaned_objects, orphaned_records))
    }

    pub async fn verify_consistency(&self) -> Result<ConsistencyReport> {
        let (orphaned_objects, orphaned_records) = self.scan().await?;
        Ok(ConsistencyReport {
            is_consistent: orphaned_objects.is_empty() && orphaned_records.is_empty(),
            orphaned_object_count: orphaned_objects.len(),
            orphaned_record_count: orphaned_records.len(),
            orphaned_objects,
            orphaned_records,
        })
    }

    /// Removes blobs that no document row references.
    pub async fn cleanup_orphaned_objects(&self, dry_run: bool) -> Result<CleanupReport> {
        let (orphaned_objects, _) = self.scan().await?;
        if orphaned_objects.is_empty() {
            return Ok(CleanupReport {
                message: "No orphaned blobs found".to_string(),
                deleted_count: 0,
                failed: Vec::new(),
            });
        }
        if dry_run {
            return Ok(CleanupReport {
                message: format!("Would delete {} orphaned blobs", orphaned_objects.len()),
                deleted_count: 0,
                failed: Vec::new(),
            });
        }

        let mut deleted_count = 0;
        let mut failed = Vec::new();
        for orphan in orphaned_objects {
            match self.services.object_store.delete(&orphan.object_key).await {
                Ok(()) => {
                    info!(object_key = %orphan.object_key, "Deleted orphaned blob");
                    deleted_count += 1;
                }
                Err(e) => {
                    error!(object_key = %orphan.object_key, error = %e, "Failed to delete orphaned blob");
                    failed.push(format!("{}: {e}", orphan.object_key));
                }
            }
        }
        Ok(CleanupReport {
            message: format!("Deleted {deleted_count} orphaned blobs"),
            deleted_count,
            failed,
        })
    }

    /// Removes document rows whose blob is gone, along with their vector
    /// points.
    pub async fn cleanup_orphaned_records(&self, dry_run: bool) -> Result<CleanupReport> {
        let (_, orphaned_records) = self.scan().await?;
        if orphaned_records.is_empty() {
            return Ok(CleanupReport {
                message: "No orphaned document rows found".to_string(),
                deleted_count: 0,
                failed: Vec::new(),
            });
        }
        if dry_run {
            return Ok(CleanupReport {
                message: format!(
                    "Would delete {} orphaned document rows",
                    orphaned_records.len()
                ),
                deleted_count: 0,
                failed: Vec::new(),
            });
        }

        let mut deleted_count = 0;
        let mut failed = Vec::new();
        for orphan in orphaned_records {
            if let Err(e) = self
                .services
                .vector_index
                .delete_by_logical_id(orphan.document_id)
                .await
            {
                error!(document_id = %orphan.document_id, error = %e, "Failed to delete vector points");
            }
            match self
                .services
                .repository
                .delete_document(orphan.document_id)
                .await
            {
                Ok(()) => {
                    info!(document_id = %orphan.document_id, "Deleted orphaned document row");
                    deleted_count += 1;
                }
                Err(e) => {
                    error!(document_id = %orphan.document_id, error = %e, "Failed to delete orphaned row");
                    failed.push(format!("{}: {e}", orphan.document_id));
                }
            }
        }
        Ok(CleanupReport {
            message: format!("Deleted {deleted_count} orphaned document rows"),
            deleted_count,
            failed,
        })
    }

    pub async fn run_full_cleanup(&self, dry_run: bool) -> Result<FullCleanupReport> {
        info!(dry_run, "Starting full cleanup");
        let consistency = self.verify_consistency().await?;
        let orphaned_objects = self.cleanup_orphaned_objects(dry_run).await?;
        let orphaned_records = self.cleanup_orphaned_records(dry_run).await?;
        Ok(FullCleanupReport {
            consistency,
            orphaned_objects,
            orphaned_records,
        })
    }
}

/// Spawns the periodic reconciliation task. Errors are logged and the loop
/// keeps going; a broken dependency this sweep is retried next sweep.
pub fn spawn_cleanup_scheduler(services: Services, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let reconciler = ReconcilerService::new(&services);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup is quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match reconciler.run_full_cleanup(false).await {
                Ok(report) => info!(
                    orphaned_objects = report.orphaned_objects.deleted_count,
                    orphaned_records = report.orphaned_records.deleted_count,
                    "Scheduled cleanup finished"
                ),
                Err(e) => error!(error = %e, "Scheduled cleanup failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestContext;
    use bytes::Bytes;
    use nh_object_store::ObjectStorage;
    use nh_vector_store::LogicalId;

    const BODY: &[u8] =
        b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check";

    #[tokio::test]
    async fn clean_stores_report_consistent() {
        let ctx = TestContext::new();
        let user = ctx.user();
        ctx.upload(&user, "notes.txt", BODY).await.unwrap();

        let report = ReconcilerService::new(&ctx.services)
            .verify_consistency()
            .await
            .unwrap();
        assert!(report.is_consistent);
    }

    #[tokio::test]
    async fn orphaned_blob_is_detected_and_swept() {
        let ctx = TestContext::new();
        let user = ctx.user();
        ctx.upload(&user, "kept.txt", BODY).await.unwrap();
        ctx.object_store
            .put("stray/leftover.bin", Bytes::from_static(b"junk"), "application/octet-stream")
            .await
            .unwrap();

        let reconciler = ReconcilerService::new(&ctx.services);
        let report = reconciler.verify_consistency().await.unwrap();
        assert!(!report.is_consistent);
        assert_eq!(report.orphaned_object_count, 1);
        assert_eq!(report.orphaned_objects[0].object_key, "stray/leftover.bin");

        // Dry run deletes nothing.
        let dry = reconciler.cleanup_orphaned_objects(true).await.unwrap();
        assert_eq!(dry.deleted_count, 0);
        assert!(ctx.object_store.contains("stray/leftover.bin"));

        let wet = reconciler.cleanup_orphaned_objects(false).await.unwrap();
        assert_eq!(wet.deleted_count, 1);
        assert!(!ctx.object_store.contains("stray/leftover.bin"));
        // The referenced blob is untouched.
        assert_eq!(ctx.object_store.object_count(), 1);
    }

    #[tokio::test]
    async fn orphaned_row_is_swept_with_its_vector_points() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let document = ctx.upload(&user, "notes.txt", BODY).await.unwrap();
        ctx.index_text(LogicalId::Document(document.id), user.id, "hello world")
            .await;

        // Simulate a lost blob.
        ctx.object_store.delete(&document.object_key).await.unwrap();

        let reconciler = ReconcilerService::new(&ctx.services);
        let report = reconciler.verify_consistency().await.unwrap();
        assert_eq!(report.orphaned_record_count, 1);

        let cleanup = reconciler.cleanup_orphaned_records(false).await.unwrap();
        assert_eq!(cleanup.deleted_count, 1);
        assert!(ctx
            .services
            .repository
            .get_document(user.id, document.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(ctx.vector_index.point_count(), 0);

        let report = reconciler.verify_consistency().await.unwrap();
        assert!(report.is_consistent);
    }
}
