//! Source lifecycle: creation with type-specific metadata validation,
//! updates, and cascade deletion across the vector store, blob store and
//! metadata rows.
//!
//! Url and text sources are indexed through the event path: creation (and
//! metadata updates) publish a `UrlSourceEvent` and the worker does the
//! fetching, chunking and embedding. Document sources are indexed through
//! the upload path of their underlying document.

use tracing::{error, info, warn};
use uuid::Uuid;

use nh_event_bus::{ChangeEvent, EventOp};

use crate::error::{Error, Result};
use crate::models::sources::{
    DeleteSourceResponse, SourceCreate, SourceMetadata, SourcePublic, SourceUpdate, SourcesPublic,
};
use crate::repository::{NewSource, Source, SourceType};
use crate::services::{CurrentUser, Services};

pub struct SourceService {
    services: Services,
}

impl SourceService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    async fn publish_source_event(&self, source: &Source, op: EventOp) {
        let event = ChangeEvent::url_source(
            op,
            source.id,
            1,
            source.source_metadata.clone(),
            source.owner_id,
        );
        if !self.services.publisher.publish(&event).await {
            warn!(source_id = %source.id, op = ?op, "Failed to publish source event");
        }
    }

    pub async fn create(&self, user: &CurrentUser, input: SourceCreate) -> Result<Source> {
        if input.title.trim().is_empty() {
            return Err(Error::BadRequest("Source title is required".to_string()));
        }
        let metadata = SourceMetadata::parse(input.source_type, &input.source_metadata)
            .map_err(Error::BadRequest)?;

        // A document source must wrap a document the caller owns.
        if let SourceMetadata::Document { document_id } = &metadata {
            if self
                .services
                .repository
                .get_document(user.id, *document_id)
                .await?
                .is_none()
            {
                return Err(Error::BadRequest(
                    "document_id does not reference one of your documents".to_string(),
                ));
            }
        }

        let source = self
            .services
            .repository
            .create_source(NewSource {
                owner_id: user.id,
                title: input.title.trim().to_string(),
                description: input.description,
                source_type: input.source_type,
                source_metadata: input.source_metadata,
            })
            .await?;

        match metadata {
            SourceMetadata::Document { document_id } => {
                self.services
                    .repository
                    .link_document_source(document_id, Some(source.id))
                    .await?;
            }
            // Url and text sources are indexed by the worker; hand it the
            // work through the change topic.
            SourceMetadata::Url { .. } | SourceMetadata::Text { .. } => {
                self.publish_source_event(&source, EventOp::Create).await;
            }
            SourceMetadata::Other(_) => {}
        }

        info!(source_id = %source.id, source_type = ?source.source_type, user = %user, "Created source");
        Ok(source)
    }

    pub async fn get(&self, user: &CurrentUser, id: Uuid) -> Result<SourcePublic> {
        let source = self.get_owned(user, id).await?;
        let notebook_count = self.services.repository.source_notebook_count(id).await?;
        Ok(SourcePublic::from_source(source, notebook_count))
    }

    pub(crate) async fn get_owned(&self, user: &CurrentUser, id: Uuid) -> Result<Source> {
        self.services
            .repository
            .get_source(user.id, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Source {id} not found or access denied")))
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        source_type: Option<SourceType>,
        skip: i64,
        limit: i64,
    ) -> Result<SourcesPublic> {
        let skip = skip.max(0);
        let limit = limit.clamp(1, 1000);
        let sources = self
            .services
            .repository
            .list_sources(user.id, source_type, skip, limit)
            .await?;
        let count = self
            .services
            .repository
            .count_sources(user.id, source_type)
            .await?;

        let mut data = Vec::with_capacity(sources.len());
        for source in sources {
            let notebook_count = self
                .services
                .repository
                .source_notebook_count(source.id)
                .await?;
            data.push(SourcePublic::from_source(source, notebook_count));
        }
        Ok(SourcesPublic { data, count })
    }

    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Uuid,
        input: SourceUpdate,
    ) -> Result<SourcePublic> {
        let source = self.get_owned(user, id).await?;

        if let Some(metadata) = &input.source_metadata {
            SourceMetadata::parse(source.source_type, metadata).map_err(Error::BadRequest)?;
        }
        let metadata_changed = input.source_metadata.is_some();

        let updated = self
            .services
            .repository
            .update_source(id, input.title, input.description, input.source_metadata)
            .await?;

        // New url/content means the indexed chunks are stale; let the
        // worker reprocess.
        if metadata_changed
            && matches!(updated.source_type, SourceType::Url | SourceType::Text)
        {
            self.publish_source_event(&updated, EventOp::Update).await;
        }

        let notebook_count = self.services.repository.source_notebook_count(id).await?;
        Ok(SourcePublic::from_source(updated, notebook_count))
    }
}

/// Cascade deletion of a source across all stores. Vector and blob
/// failures are logged, never fatal: the metadata row always goes, and the
/// reconciler sweeps whatever cleanup was missed.
pub struct SourceDeleteService {
    services: Services,
}

impl SourceDeleteService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn delete_source(
        &self,
        user: &CurrentUser,
        source_id: Uuid,
    ) -> Result<DeleteSourceResponse> {
        let source = self
            .services
            .repository
            .get_source(user.id, source_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Source {source_id} not found or access denied"))
            })?;

        info!(
            source_id = %source_id,
            source_type = ?source.source_type,
            "Starting cascade deletion for source"
        );
        self.cleanup_storage(user, &source).await;

        self.services.repository.delete_source(source.id).await?;

        info!(source_id = %source_id, user = %user, "Deleted source");
        Ok(DeleteSourceResponse {
            message: "Source deleted successfully".to_string(),
            source_id,
        })
    }

    async fn cleanup_storage(&self, user: &CurrentUser, source: &Source) {
        match source.source_type {
            SourceType::Document => self.cleanup_document_storage(user, source).await,
            SourceType::Url | SourceType::Text => {
                // Points for url/text sources are keyed by the source id.
                if let Err(e) = self
                    .services
                    .vector_index
                    .delete_by_logical_id(source.id)
                    .await
                {
                    error!(source_id = %source.id, error = %e, "Failed to delete vector points");
                }
            }
            // Video and image sources have no indexed or stored content.
            SourceType::Video | SourceType::Image => {}
        }
    }

    async fn cleanup_document_storage(&self, user: &CurrentUser, source: &Source) {
        let Ok(SourceMetadata::Document { document_id }) =
            SourceMetadata::parse(SourceType::Document, &source.source_metadata)
        else {
            warn!(source_id = %source.id, "No document_id in document source metadata");
            return;
        };

        // Points for document sources are keyed by the document id.
        if let Err(e) = self
            .services
            .vector_index
            .delete_by_logical_id(document_id)
            .await
        {
            error!(document_id = %document_id, error = %e, "Failed to delete vector points");
        }

        match self.services.repository.get_document(user.id, document_id).await {
            Ok(Some(document)) => {
                if let Err(e) = self.services.object_store.delete(&document.object_key).await {
                    error!(
                        document_id = %document_id,
                        object_key = %document.object_key,
                        error = %e,
                        "Failed to delete blob during source cascade"
                    );
                }
                if let Err(e) = self.services.repository.delete_document(document.id).await {
                    error!(document_id = %document_id, error = %e, "Failed to delete document row");
                }
            }
            Ok(None) => {
                warn!(document_id = %document_id, "Document not found during source cascade")
            }
            Err(e) => error!(document_id = %document_id, error = %e, "Document lookup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestContext;
    use nh_vector_store::LogicalId;

    const BODY: &[u8] =
        b"hello world, this is a note whose body carries comfortably more than one hundred bytes so it clears the minimum upload size check";

    fn url_source(url: &str) -> SourceCreate {
        SourceCreate {
            title: "A page".to_string(),
            description: None,
            source_type: SourceType::Url,
            source_metadata: serde_json::json!({"url": url}),
        }
    }

    #[tokio::test]
    async fn url_source_creation_publishes_a_create_event() {
        let ctx = TestContext::new();
        let user = ctx.user();

        let source = SourceService::new(&ctx.services)
            .create(&user, url_source("https://example.com"))
            .await
            .unwrap();

        let events = ctx.publisher.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ChangeEvent::UrlSource(e) => {
                assert_eq!(e.op, EventOp::Create);
                assert_eq!(e.source_id, source.id);
                assert_eq!(e.metadata["url"], "https://example.com");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_source_creation_takes_the_same_event_path() {
        let ctx = TestContext::new();
        let user = ctx.user();

        let source = SourceService::new(&ctx.services)
            .create(
                &user,
                SourceCreate {
                    title: "Pasted notes".to_string(),
                    description: None,
                    source_type: SourceType::Text,
                    source_metadata: serde_json::json!({"content": "some pasted text"}),
                },
            )
            .await
            .unwrap();

        let events = ctx.publisher.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ChangeEvent::UrlSource(e) => {
                assert_eq!(e.source_id, source.id);
                assert_eq!(e.metadata["content"], "some pasted text");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_metadata_is_rejected_with_bad_request() {
        let ctx = TestContext::new();
        let user = ctx.user();

        let err = SourceService::new(&ctx.services)
            .create(
                &user,
                SourceCreate {
                    title: "broken".to_string(),
                    description: None,
                    source_type: SourceType::Url,
                    source_metadata: serde_json::json!({}),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(ctx.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn document_source_links_the_document_row() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let document = ctx.upload(&user, "notes.txt", BODY).await.unwrap();

        let source = SourceService::new(&ctx.services)
            .create(
                &user,
                SourceCreate {
                    title: "notes".to_string(),
                    description: None,
                    source_type: SourceType::Document,
                    source_metadata: serde_json::json!({"document_id": document.id.to_string()}),
                },
            )
            .await
            .unwrap();

        let linked = ctx
            .services
            .repository
            .get_document(user.id, document.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.source_id, Some(source.id));
    }

    #[tokio::test]
    async fn document_source_over_a_foreign_document_is_rejected() {
        let ctx = TestContext::new();
        let owner = ctx.user();
        let stranger = ctx.user();
        let document = ctx.upload(&owner, "notes.txt", BODY).await.unwrap();

        let err = SourceService::new(&ctx.services)
            .create(
                &stranger,
                SourceCreate {
                    title: "stolen".to_string(),
                    description: None,
                    source_type: SourceType::Document,
                    source_metadata: serde_json::json!({"document_id": document.id.to_string()}),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn deleting_a_url_source_removes_its_vector_points() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let source = SourceService::new(&ctx.services)
            .create(&user, url_source("https://example.com"))
            .await
            .unwrap();
        ctx.index_text(LogicalId::Source(source.id), user.id, "example body text")
            .await;
        assert_eq!(ctx.vector_index.point_count(), 1);

        SourceDeleteService::new(&ctx.services)
            .delete_source(&user, source.id)
            .await
            .unwrap();

        assert_eq!(ctx.vector_index.point_count(), 0);
        assert!(ctx
            .services
            .repository
            .get_source(user.id, source.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn deleting_a_document_source_cascades_to_all_stores() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let document = ctx.upload(&user, "notes.txt", BODY).await.unwrap();
        let source = SourceService::new(&ctx.services)
            .create(
                &user,
                SourceCreate {
                    title: "notes".to_string(),
                    description: None,
                    source_type: SourceType::Document,
                    source_metadata: serde_json::json!({"document_id": document.id.to_string()}),
                },
            )
            .await
            .unwrap();
        ctx.index_text(LogicalId::Document(document.id), user.id, "hello world")
            .await;

        SourceDeleteService::new(&ctx.services)
            .delete_source(&user, source.id)
            .await
            .unwrap();

        assert_eq!(ctx.vector_index.point_count(), 0);
        assert!(!ctx.object_store.contains(&document.object_key));
        assert!(ctx
            .services
            .repository
            .get_document(user.id, document.id)
            .await
            .unwrap()
            .is_none());
        assert!(ctx
            .services
            .repository
            .get_source(user.id, source.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn metadata_update_republishes_for_reindexing() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let source = SourceService::new(&ctx.services)
            .create(&user, url_source("https://example.com"))
            .await
            .unwrap();
        ctx.publisher.take_events();

        SourceService::new(&ctx.services)
            .update(
                &user,
                source.id,
                SourceUpdate {
                    source_metadata: Some(serde_json::json!({"url": "https://example.org"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let events = ctx.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].op(), EventOp::Update);
    }
}
