//! Shared wiring for unit and handler tests: the full service graph over
//! in-memory doubles, plus helpers for the repetitive setup steps.

use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use nh_embeddings::{Embedder, FakeEmbedder};
use nh_event_bus::RecordingPublisher;
use nh_object_store::InMemoryObjectStore;
use nh_vector_store::{ChunkData, InMemoryVectorIndex, LogicalId, VectorIndex};

use crate::config::Config;
use crate::error::Result;
use crate::repository::{Document, MockRepository};
use crate::services::rate_limit::DbRateLimiter;
use crate::services::uploads::{FileUploadService, UploadedFile};
use crate::services::{CurrentUser, RateLimiter, Services};

pub(crate) struct TestContext {
    pub services: Services,
    pub repository: Arc<MockRepository>,
    pub object_store: Arc<InMemoryObjectStore>,
    pub vector_index: Arc<InMemoryVectorIndex>,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.auth.secret = "test-secret".to_string();
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        let repository = Arc::new(MockRepository::new());
        let object_store = Arc::new(InMemoryObjectStore::new(&config.storage.bucket));
        let vector_index = Arc::new(InMemoryVectorIndex::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let embedder = Arc::new(FakeEmbedder::default());
        let rate_limiter: Arc<dyn RateLimiter> = Arc::new(DbRateLimiter::new(
            repository.clone(),
            config.limits.max_concurrent_processing_per_user,
        ));

        let services = Services::new(
            Arc::new(config),
            repository.clone(),
            object_store.clone(),
            vector_index.clone(),
            embedder,
            publisher.clone(),
            rate_limiter,
        );

        Self {
            services,
            repository,
            object_store,
            vector_index,
            publisher,
        }
    }

    pub fn user(&self) -> CurrentUser {
        CurrentUser {
            id: Uuid::now_v7(),
            is_superuser: false,
        }
    }

    pub fn superuser(&self) -> CurrentUser {
        CurrentUser {
            id: Uuid::now_v7(),
            is_superuser: true,
        }
    }

    pub fn token_for(&self, user: &CurrentUser) -> String {
        self.services
            .auth
            .issue_token(user.id, user.is_superuser, 3600)
    }

    pub async fn upload(
        &self,
        user: &CurrentUser,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Document> {
        FileUploadService::new(&self.services)
            .upload_file(
                user,
                UploadedFile {
                    filename: filename.to_string(),
                    content_type: Some("text/plain".to_string()),
                    bytes: Bytes::copy_from_slice(bytes),
                },
            )
            .await
    }

    /// Stands in for the indexing worker: embeds `text` as a single chunk
    /// under the given logical id.
    pub async fn index_text(&self, logical_id: LogicalId, owner: Uuid, text: &str) {
        let embeddings = self
            .services
            .embedder
            .embed(&[text.to_string()])
            .await
            .expect("fake embedder never fails");
        self.vector_index
            .upsert_chunks(
                logical_id,
                owner,
                vec![ChunkData {
                    text: text.to_string(),
                    filename: None,
                    url: None,
                    source_type: None,
                    metadata: serde_json::Value::Null,
                }],
                embeddings,
            )
            .await
            .expect("in-memory upsert never fails");
    }
}
