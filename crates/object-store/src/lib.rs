//! Blob storage gateway.
//!
//! A small facade over an S3-compatible object store (MinIO in the default
//! deployment). The gateway is bound to a single bucket at construction;
//! keys follow the `{owner_id}/{filename}` convention but the gateway never
//! parses them. Transient I/O failures are retried with exponential backoff
//! before surfacing.

pub mod memory;
mod retry;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryObjectStore;
pub use s3::{S3Config, S3ObjectStore};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    Transport(String),
}

impl ObjectStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound(_))
    }
}

/// Listing entry returned by [`ObjectStorage::list`].
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    /// Seconds since the epoch, when the backend reports it.
    pub last_modified: Option<i64>,
}

/// Content-addressed blob operations over the configured bucket.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// The bucket this gateway writes to.
    fn bucket(&self) -> &str;

    /// Creates the bucket if it does not exist yet. Idempotent; runs at
    /// startup.
    async fn ensure_bucket(&self) -> Result<(), ObjectStoreError>;

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// A pre-authorized GET URL valid for `expires_in`.
    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError>;

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>, ObjectStoreError>;
}
