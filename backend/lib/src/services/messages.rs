//! Notebook conversation log.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::messages::{
    NotebookMessageCreate, NotebookMessagePublic, NotebookMessagesPublic,
};
use crate::models::Pagination;
use crate::services::notebooks::NotebookService;
use crate::services::{CurrentUser, Services};

const MAX_CONTENT_CHARS: usize = 10_000;

pub struct MessageService {
    services: Services,
}

impl MessageService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn create(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
        input: NotebookMessageCreate,
    ) -> Result<NotebookMessagePublic> {
        NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;

        if input.content.trim().is_empty() {
            return Err(Error::BadRequest("Message content is required".to_string()));
        }
        if input.content.chars().count() > MAX_CONTENT_CHARS {
            return Err(Error::BadRequest(format!(
                "Message content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }
        if input.role != "user" && input.role != "assistant" {
            return Err(Error::BadRequest(
                "Message role must be 'user' or 'assistant'".to_string(),
            ));
        }

        let message = self
            .services
            .repository
            .create_message(notebook_id, input.role, input.content, input.used_sources)
            .await?;
        Ok(message.into())
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        notebook_id: Uuid,
        page: Pagination,
    ) -> Result<NotebookMessagesPublic> {
        NotebookService::new(&self.services)
            .get_owned(user, notebook_id)
            .await?;

        let page = page.clamped();
        let messages = self
            .services
            .repository
            .list_messages(notebook_id, page.skip, page.limit)
            .await?;
        let count = self.services.repository.count_messages(notebook_id).await?;
        Ok(NotebookMessagesPublic {
            data: messages.into_iter().map(Into::into).collect(),
            count,
        })
    }
}
