//! Notebook membership management.
//!
//! Attaching is idempotent: the unique `(notebook_id, source_id)`
//! constraint backs it, and an attach of an existing pair returns the
//! existing row instead of erroring, so client retries converge. Detaching
//! removes the junction row only, never the source.

use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::notebook_sources::{
    DetachResponse, NotebookSourceCreate, NotebookSourcePublic, NotebookSourceUpdate,
    NotebookSourcesPublic,
};
use crate::models::sources::SourcePublic;
use crate::repository::NotebookSource;
use crate::services::notebooks::NotebookService;
use crate::services::sources::SourceService;
use crate::services::{CurrentUser, Services};

pub struct NotebookSourceService {
    services: Services,
}

impl NotebookSourceService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    async fn enrich(&self, membership: NotebookSource, user: &CurrentUser) -> Result<NotebookSourcePublic> {
        let source = SourceService::new(&self.services)
            .get(user, membership.source_id)
            .await?;
        Ok(NotebookSourcePublic::from_membership(membership, source))
    }

    /// Attaches a source to a notebook. Returns the membership row and
    /// whether it was newly created.
    pub async fn attach(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
        input: NotebookSourceCreate,
    ) -> Result<(NotebookSourcePublic, bool)> {
        NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;
        SourceService::new(&self.services)
            .get_owned(user, input.source_id)
            .await?;

        if let Some(position) = input.position {
            if position < 0 {
                return Err(Error::BadRequest("position must be >= 0".to_string()));
            }
        }

        if let Some(existing) = self
            .services
            .repository
            .get_membership(notebook_id, input.source_id)
            .await?
        {
            return Ok((self.enrich(existing, user).await?, false));
        }

        match self
            .services
            .repository
            .insert_membership(notebook_id, input.source_id, input.position)
            .await
        {
            Ok(membership) => {
                info!(
                    notebook_id = %notebook_id,
                    source_id = %input.source_id,
                    position = membership.position,
                    "Attached source to notebook"
                );
                Ok((self.enrich(membership, user).await?, true))
            }
            // Insert race with a concurrent attach of the same pair: fall
            // back to the row that won.
            Err(e) if e.is_duplicate() => {
                let existing = self
                    .services
                    .repository
                    .get_membership(notebook_id, input.source_id)
                    .await?
                    .ok_or(Error::Internal)?;
                Ok((self.enrich(existing, user).await?, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
    ) -> Result<NotebookSourcesPublic> {
        NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;

        let memberships = self.services.repository.list_memberships(notebook_id).await?;
        let count = memberships.len() as i64;
        let mut data = Vec::with_capacity(memberships.len());
        for membership in memberships {
            // Sources are owned by the notebook's owner; a missing row here
            // means a concurrent delete, skip it.
            let source = match self
                .services
                .repository
                .get_source(user.id, membership.source_id)
                .await?
            {
                Some(source) => source,
                None => continue,
            };
            let notebook_count = self
                .services
                .repository
                .source_notebook_count(source.id)
                .await?;
            data.push(NotebookSourcePublic::from_membership(
                membership,
                SourcePublic::from_source(source, notebook_count),
            ));
        }
        Ok(NotebookSourcesPublic { data, count })
    }

    pub async fn update_position(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
        source_id: Uuid,
        input: NotebookSourceUpdate,
    ) -> Result<NotebookSourcePublic> {
        NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;
        if input.position < 0 {
            return Err(Error::BadRequest("position must be >= 0".to_string()));
        }

        let membership = self
            .services
            .repository
            .get_membership(notebook_id, source_id)
            .await?
            .ok_or_else(|| Error::NotFound("Source not attached to notebook".to_string()))?;

        let updated = self
            .services
            .repository
            .update_membership_position(membership.id, input.position)
            .await?;
        self.enrich(updated, user).await
    }

    pub async fn detach(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
        source_id: Uuid,
    ) -> Result<DetachResponse> {
        NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;

        let membership = self
            .services
            .repository
            .get_membership(notebook_id, source_id)
            .await?
            .ok_or_else(|| Error::NotFound("Source not attached to notebook".to_string()))?;

        self.services.repository.delete_membership(membership.id).await?;
        info!(notebook_id = %notebook_id, source_id = %source_id, "Detached source from notebook");
        Ok(DetachResponse {
            message: "Source removed from notebook".to_string(),
            notebook_id,
            source_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notebooks::NotebookCreate;
    use crate::models::sources::SourceCreate;
    use crate::repository::SourceType;
    use crate::test_utils::TestContext;

    async fn setup(ctx: &TestContext, user: &CurrentUser) -> (Uuid, Uuid) {
        let notebook = NotebookService::new(&ctx.services)
            .create(user, NotebookCreate { title: "nb".into(), description: None })
            .await
            .unwrap();
        let source = SourceService::new(&ctx.services)
            .create(
                user,
                SourceCreate {
                    title: "src".into(),
                    description: None,
                    source_type: SourceType::Text,
                    source_metadata: serde_json::json!({"content": "text"}),
                },
            )
            .await
            .unwrap();
        (notebook.id, source.id)
    }

    #[tokio::test]
    async fn attach_is_idempotent() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let (notebook_id, source_id) = setup(&ctx, &user).await;
        let service = NotebookSourceService::new(&ctx.services);

        let (first, created) = service
            .attach(&user, notebook_id, NotebookSourceCreate { source_id, position: None })
            .await
            .unwrap();
        assert!(created);

        let (second, created) = service
            .attach(&user, notebook_id, NotebookSourceCreate { source_id, position: None })
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        let listed = service.list(&user, notebook_id).await.unwrap();
        assert_eq!(listed.count, 1);
    }

    #[tokio::test]
    async fn positions_default_to_append_order() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let (notebook_id, first_source) = setup(&ctx, &user).await;
        let service = NotebookSourceService::new(&ctx.services);

        let (first, _) = service
            .attach(&user, notebook_id, NotebookSourceCreate { source_id: first_source, position: None })
            .await
            .unwrap();
        assert_eq!(first.position, 0);

        let second_source = SourceService::new(&ctx.services)
            .create(
                &user,
                SourceCreate {
                    title: "second".into(),
                    description: None,
                    source_type: SourceType::Text,
                    source_metadata: serde_json::json!({"content": "more"}),
                },
            )
            .await
            .unwrap();
        let (second, _) = service
            .attach(&user, notebook_id, NotebookSourceCreate { source_id: second_source.id, position: None })
            .await
            .unwrap();
        assert_eq!(second.position, 1);

        // Reorder.
        let updated = service
            .update_position(
                &user,
                notebook_id,
                second_source.id,
                NotebookSourceUpdate { position: 0 },
            )
            .await
            .unwrap();
        assert_eq!(updated.position, 0);
    }

    #[tokio::test]
    async fn detach_leaves_the_source_intact() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let (notebook_id, source_id) = setup(&ctx, &user).await;
        let service = NotebookSourceService::new(&ctx.services);
        service
            .attach(&user, notebook_id, NotebookSourceCreate { source_id, position: None })
            .await
            .unwrap();

        service.detach(&user, notebook_id, source_id).await.unwrap();

        assert_eq!(service.list(&user, notebook_id).await.unwrap().count, 0);
        assert!(ctx
            .services
            .repository
            .get_source(user.id, source_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn attaching_a_foreign_source_is_not_found() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let stranger = ctx.user();
        let (notebook_id, _) = setup(&ctx, &user).await;
        let (_, foreign_source) = setup(&ctx, &stranger).await;

        let err = NotebookSourceService::new(&ctx.services)
            .attach(
                &user,
                notebook_id,
                NotebookSourceCreate { source_id: foreign_source, position: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
