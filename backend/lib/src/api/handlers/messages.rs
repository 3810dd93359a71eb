//! Handlers for the notebook message log.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::Error;
use crate::models::messages::NotebookMessageCreate;
use crate::models::Pagination;
use crate::services::messages::MessageService;
use crate::services::{CurrentUser, Services};

pub async fn create_message(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
    Json(input): Json<NotebookMessageCreate>,
) -> Result<impl IntoResponse, Error> {
    let response = MessageService::new(&services)
        .create(&user, notebook_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_messages(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, Error> {
    let response = MessageService::new(&services)
        .list(&user, notebook_id, page)
        .await?;
    Ok(Json(response))
}
