//! In-memory gateway for tests and local development.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{ObjectInfo, ObjectStorage, ObjectStoreError};

#[derive(Clone)]
struct StoredObject {
    bytes: Bytes,
    #[allow(dead_code)]
    content_type: String,
}

/// Thread-safe in-memory implementation of [`ObjectStorage`]. All data is
/// lost when the process terminates.
#[derive(Default)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    fail_puts: RwLock<bool>,
    fail_deletes: RwLock<bool>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Makes subsequent `put` calls fail, to exercise upload rollback paths.
    pub fn set_fail_puts(&self, fail: bool) {
        *self.fail_puts.write() = fail;
    }

    /// Makes subsequent `delete` calls fail, to exercise delete fail-fast
    /// paths.
    pub fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.write() = fail;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        Ok(())
    }

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        if *self.fail_puts.read() {
            return Err(ObjectStoreError::Transport("put disabled".into()));
        }
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        if *self.fail_deletes.read() {
            return Err(ObjectStoreError::Transport("delete disabled".into()));
        }
        self.objects.write().remove(key);
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError> {
        if !self.contains(key) {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        Ok(format!(
            "memory://{}/{}?expires={}",
            self.bucket,
            key,
            expires_in.as_secs()
        ))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        let objects = self.objects.read();
        Ok(objects
            .iter()
            .filter(|(key, _)| prefix.map_or(true, |p| key.starts_with(p)))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.bytes.len() as i64,
                last_modified: None,
            })
            .collect())
    }
}
