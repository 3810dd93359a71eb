//! Notebook CRUD and orphan-aware cascade deletion.

use tracing::{error, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::notebooks::{
    CleanupSummary, FailedSourceDeletion, NotebookCreate, NotebookDeleteResponse, NotebookPublic,
    NotebookUpdate, NotebooksPublic,
};
use crate::models::Pagination;
use crate::repository::{Notebook, Source};
use crate::services::sources::SourceDeleteService;
use crate::services::{CurrentUser, Services};

pub struct NotebookService {
    services: Services,
}

impl NotebookService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub(crate) async fn get_owned(&self, user: &CurrentUser, id: Uuid) -> Result<Notebook> {
        self.services
            .repository
            .get_notebook(user.id, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Notebook {id} not found or access denied")))
    }

    pub async fn create(&self, user: &CurrentUser, input: NotebookCreate) -> Result<NotebookPublic> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::BadRequest("Notebook title is required".to_string()));
        }
        let notebook = self
            .services
            .repository
            .create_notebook(user.id, title, input.description)
            .await?;
        info!(notebook_id = %notebook.id, user = %user, "Created notebook");
        Ok(NotebookPublic::from_notebook(notebook, 0))
    }

    pub async fn get(&self, user: &CurrentUser, id: Uuid) -> Result<NotebookPublic> {
        let notebook = self.get_owned(user, id).await?;
        let source_count = self.services.repository.notebook_source_count(id).await?;
        Ok(NotebookPublic::from_notebook(notebook, source_count))
    }

    pub async fn list(&self, user: &CurrentUser, page: Pagination) -> Result<NotebooksPublic> {
        let page = page.clamped();
        let notebooks = self
            .services
            .repository
            .list_notebooks(user.id, page.skip, page.limit)
            .await?;
        let count = self.services.repository.count_notebooks(user.id).await?;

        let mut data = Vec::with_capacity(notebooks.len());
        for notebook in notebooks {
            let source_count = self
                .services
                .repository
                .notebook_source_count(notebook.id)
                .await?;
            data.push(NotebookPublic::from_notebook(notebook, source_count));
        }
        Ok(NotebooksPublic { data, count })
    }

    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Uuid,
        input: NotebookUpdate,
    ) -> Result<NotebookPublic> {
        self.get_owned(user, id).await?;
        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(Error::BadRequest("Notebook title cannot be empty".to_string()));
            }
        }
        let notebook = self
            .services
            .repository
            .update_notebook(id, input.title.map(|t| t.trim().to_string()), input.description)
            .await?;
        let source_count = self.services.repository.notebook_source_count(id).await?;
        Ok(NotebookPublic::from_notebook(notebook, source_count))
    }
}

/// Deletes a notebook together with every source that would otherwise be
/// left orphaned: a source whose only containing notebook (among this
/// owner's notebooks) is the one being deleted is removed from the
/// relational store, the vector store and, for document sources, the blob
/// store.
pub struct NotebookDeleteService {
    services: Services,
}

impl NotebookDeleteService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn delete_notebook(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
    ) -> Result<NotebookDeleteResponse> {
        let notebook = NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;
        info!(notebook_id = %notebook_id, title = %notebook.title, "Deleting notebook");

        let orphans = self.identify_orphaned_sources(user, notebook_id).await?;
        let cleanup_summary = self.cleanup_orphaned_sources(user, orphans).await;

        // DB cascade takes the remaining junction rows and messages.
        self.services.repository.delete_notebook(notebook_id).await?;

        info!(
            notebook_id = %notebook_id,
            orphaned = cleanup_summary.total_orphaned,
            deleted = cleanup_summary.successfully_deleted,
            "Deleted notebook"
        );
        Ok(NotebookDeleteResponse {
            message: "Notebook deleted successfully".to_string(),
            notebook_id,
            cleanup_summary,
        })
    }

    async fn identify_orphaned_sources(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
    ) -> Result<Vec<Source>> {
        let memberships = self.services.repository.list_memberships(notebook_id).await?;

        let mut orphans = Vec::new();
        for membership in memberships {
            let elsewhere = self
                .services
                .repository
                .count_other_memberships(membership.source_id, notebook_id, user.id)
                .await?;
            if elsewhere > 0 {
                continue;
            }
            if let Some(source) = self
                .services
                .repository
                .get_source(user.id, membership.source_id)
                .await?
            {
                info!(source_id = %source.id, "Source will be orphaned by notebook deletion");
                orphans.push(source);
            }
        }
        Ok(orphans)
    }

    async fn cleanup_orphaned_sources(
        &self,
        user: &CurrentUser,
        orphans: Vec<Source>,
    ) -> CleanupSummary {
        let mut summary = CleanupSummary {
            total_orphaned: orphans.len(),
            ..Default::default()
        };

        let delete_service = SourceDeleteService::new(&self.services);
        for source in orphans {
            match delete_service.delete_source(user, source.id).await {
                Ok(_) => {
                    summary.successfully_deleted += 1;
                    summary.deleted_source_ids.push(source.id);
                }
                Err(e) => {
                    error!(source_id = %source.id, error = %e, "Failed to delete orphaned source");
                    summary.failed_deletions.push(FailedSourceDeletion {
                        source_id: source.id,
                        title: source.title,
                        error: e.to_string(),
                    });
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sources::SourceCreate;
    use crate::repository::SourceType;
    use crate::services::sources::SourceService;
    use crate::test_utils::TestContext;
    use nh_vector_store::LogicalId;

    async fn text_source(ctx: &TestContext, user: &CurrentUser, title: &str) -> Source {
        SourceService::new(&ctx.services)
            .create(
                user,
                SourceCreate {
                    title: title.to_string(),
                    description: None,
                    source_type: SourceType::Text,
                    source_metadata: serde_json::json!({"content": format!("content of {title}")}),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_notebook_deletion_reports_zero_orphans() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let notebook = NotebookService::new(&ctx.services)
            .create(
                &user,
                NotebookCreate {
                    title: "empty".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        let response = NotebookDeleteService::new(&ctx.services)
            .delete_notebook(&user, notebook.id)
            .await
            .unwrap();
        assert_eq!(response.cleanup_summary.total_orphaned, 0);
        assert_eq!(response.cleanup_summary.successfully_deleted, 0);
    }

    #[tokio::test]
    async fn orphan_cascade_spares_sources_shared_with_other_notebooks() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let service = NotebookService::new(&ctx.services);
        let n1 = service
            .create(&user, NotebookCreate { title: "N1".into(), description: None })
            .await
            .unwrap();
        let n2 = service
            .create(&user, NotebookCreate { title: "N2".into(), description: None })
            .await
            .unwrap();

        // S1 lives only in N1; S2 lives in both.
        let s1 = text_source(&ctx, &user, "S1").await;
        let s2 = text_source(&ctx, &user, "S2").await;
        let repo = &ctx.services.repository;
        repo.insert_membership(n1.id, s1.id, None).await.unwrap();
        repo.insert_membership(n1.id, s2.id, None).await.unwrap();
        repo.insert_membership(n2.id, s2.id, None).await.unwrap();

        ctx.index_text(LogicalId::Source(s1.id), user.id, "content of S1").await;
        ctx.index_text(LogicalId::Source(s2.id), user.id, "content of S2").await;

        let response = NotebookDeleteService::new(&ctx.services)
            .delete_notebook(&user, n1.id)
            .await
            .unwrap();

        assert_eq!(response.cleanup_summary.total_orphaned, 1);
        assert_eq!(response.cleanup_summary.successfully_deleted, 1);
        assert_eq!(response.cleanup_summary.deleted_source_ids, vec![s1.id]);

        // S1 is gone everywhere; S2 survives and stays attached to N2.
        assert!(repo.get_source(user.id, s1.id).await.unwrap().is_none());
        assert!(ctx.vector_index.records_for(s1.id).is_empty());
        assert!(repo.get_source(user.id, s2.id).await.unwrap().is_some());
        assert_eq!(ctx.vector_index.records_for(s2.id).len(), 1);
        assert_eq!(repo.notebook_source_count(n2.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_source_id_in_another_owners_notebook_does_not_block_orphaning() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let service = NotebookService::new(&ctx.services);
        let mine = service
            .create(&user, NotebookCreate { title: "mine".into(), description: None })
            .await
            .unwrap();
        let source = text_source(&ctx, &user, "only-here").await;
        ctx.services
            .repository
            .insert_membership(mine.id, source.id, None)
            .await
            .unwrap();

        // Orphan detection only considers notebooks of the same owner.
        let response = NotebookDeleteService::new(&ctx.services)
            .delete_notebook(&user, mine.id)
            .await
            .unwrap();
        assert_eq!(response.cleanup_summary.successfully_deleted, 1);
    }

    #[tokio::test]
    async fn deleting_a_foreign_notebook_is_not_found() {
        let ctx = TestContext::new();
        let owner = ctx.user();
        let stranger = ctx.user();
        let notebook = NotebookService::new(&ctx.services)
            .create(&owner, NotebookCreate { title: "mine".into(), description: None })
            .await
            .unwrap();

        let err = NotebookDeleteService::new(&ctx.services)
            .delete_notebook(&stranger, notebook.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(ctx
            .services
            .repository
            .get_notebook(owner.id, notebook.id)
            .await
            .unwrap()
            .is_some());
    }
}
