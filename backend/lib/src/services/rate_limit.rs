//! Per-user concurrency gate.
//!
//! Admission is decided from live database state: the number of the user's
//! documents currently in `processing`. The gate is advisory, not a mutex;
//! two uploads admitted concurrently can briefly overshoot the cap by one,
//! which is acceptable. A token-bucket implementation can slot in behind
//! the same trait later.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::repository::{Repository, RepositoryResult};

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Whether `user_id` may start processing another file.
    async fn check_processing_limit(&self, user_id: Uuid) -> RepositoryResult<bool>;

    fn max_concurrent_processing(&self) -> usize;
}

/// Counts `processing` documents across all of the user's notebooks on
/// every call.
pub struct DbRateLimiter {
    repository: Arc<dyn Repository>,
    max_concurrent_processing: usize,
}

impl DbRateLimiter {
    pub fn new(repository: Arc<dyn Repository>, max_concurrent_processing: usize) -> Self {
        Self {
            repository,
            max_concurrent_processing,
        }
    }
}

#[async_trait]
impl RateLimiter for DbRateLimiter {
    async fn check_processing_limit(&self, user_id: Uuid) -> RepositoryResult<bool> {
        let processing = self
            .repository
            .count_processing_documents(user_id)
            .await?;
        Ok((processing as usize) < self.max_concurrent_processing)
    }

    fn max_concurrent_processing(&self) -> usize {
        self.max_concurrent_processing
    }
}

/// Fixed-answer limiter for tests.
pub struct MockRateLimiter {
    allow: bool,
    max_concurrent_processing: usize,
}

impl MockRateLimiter {
    pub fn allowing() -> Self {
        Self {
            allow: true,
            max_concurrent_processing: 5,
        }
    }

    pub fn denying() -> Self {
        Self {
            allow: false,
            max_concurrent_processing: 5,
        }
    }
}

#[async_trait]
impl RateLimiter for MockRateLimiter {
    async fn check_processing_limit(&self, _user_id: Uuid) -> RepositoryResult<bool> {
        Ok(self.allow)
    }

    fn max_concurrent_processing(&self) -> usize {
        self.max_concurrent_processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockRepository, NewDocument, ProcessingStatus};

    fn new_document(owner: Uuid, key: &str) -> NewDocument {
        NewDocument {
            owner_id: owner,
            filename: key.to_string(),
            mime_type: "text/plain".into(),
            size: 200,
            bucket: "app-docs".into(),
            object_key: format!("{owner}/{key}"),
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn gate_counts_only_processing_documents_of_the_user() {
        let repo = Arc::new(MockRepository::new());
        let limiter = DbRateLimiter::new(repo.clone(), 2);
        let user = Uuid::now_v7();
        let other = Uuid::now_v7();

        // Pending documents do not count.
        let a = repo.create_document(new_document(user, "a.txt")).await.unwrap();
        let b = repo.create_document(new_document(user, "b.txt")).await.unwrap();
        assert!(limiter.check_processing_limit(user).await.unwrap());

        repo.update_document_status(a.id, ProcessingStatus::Processing).await.unwrap();
        assert!(limiter.check_processing_limit(user).await.unwrap());

        repo.update_document_status(b.id, ProcessingStatus::Processing).await.unwrap();
        assert!(!limiter.check_processing_limit(user).await.unwrap());

        // Another user's processing load never affects this user.
        assert!(limiter.check_processing_limit(other).await.unwrap());

        // Finishing one slot reopens the gate.
        repo.update_document_status(a.id, ProcessingStatus::Indexed).await.unwrap();
        assert!(limiter.check_processing_limit(user).await.unwrap());
    }
}
