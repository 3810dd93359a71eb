//! Services module for the NotebookHub backend.

pub mod auth;
pub mod documents;
pub mod messages;
pub mod notebook_sources;
pub mod notebooks;
pub mod rate_limit;
pub mod reconciler;
pub mod retrieval;
pub mod search;
pub mod sources;
pub mod uploads;

use std::sync::Arc;

use nh_embeddings::Embedder;
use nh_event_bus::EventPublisher;
use nh_object_store::ObjectStorage;
use nh_vector_store::VectorIndex;

use crate::config::Config;
use crate::repository::Repository;

pub use auth::{AuthService, CurrentUser, Superuser};
pub use rate_limit::RateLimiter;

/// Shared handles every request handler works with. Cloning is cheap; all
/// members are behind `Arc`.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub repository: Arc<dyn Repository>,
    pub object_store: Arc<dyn ObjectStorage>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub publisher: Arc<dyn EventPublisher>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl Services {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        repository: Arc<dyn Repository>,
        object_store: Arc<dyn ObjectStorage>,
        vector_index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        publisher: Arc<dyn EventPublisher>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(config.auth.secret.as_bytes()));
        Self {
            config,
            auth,
            repository,
            object_store,
            vector_index,
            embedder,
            publisher,
            rate_limiter,
        }
    }
}
