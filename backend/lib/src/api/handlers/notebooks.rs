//! Handlers for notebook management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::models::notebooks::{NotebookCreate, NotebookUpdate};
use crate::models::Pagination;
use crate::services::notebooks::{NotebookDeleteService, NotebookService};
use crate::services::{CurrentUser, Services};

pub async fn create_notebook(
    State(services): State<Services>,
    user: CurrentUser,
    Json(input): Json<NotebookCreate>,
) -> Result<impl IntoResponse, Error> {
    debug!(%user, "POST create notebook");
    let response = NotebookService::new(&services).create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_notebooks(
    State(services): State<Services>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, Error> {
    let response = NotebookService::new(&services).list(&user, page).await?;
    Ok(Json(response))
}

pub async fn get_notebook(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let response = NotebookService::new(&services).get(&user, notebook_id).await?;
    Ok(Json(response))
}

pub async fn update_notebook(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
    Json(input): Json<NotebookUpdate>,
) -> Result<impl IntoResponse, Error> {
    let response = NotebookService::new(&services)
        .update(&user, notebook_id, input)
        .await?;
    Ok(Json(response))
}

pub async fn delete_notebook(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    debug!(notebook_id = %notebook_id, %user, "DELETE notebook");
    let response = NotebookDeleteService::new(&services)
        .delete_notebook(&user, notebook_id)
        .await?;
    Ok(Json(response))
}
