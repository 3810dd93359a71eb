//! Handlers for notebook-source membership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::models::notebook_sources::{NotebookSourceCreate, NotebookSourceUpdate};
use crate::services::notebook_sources::NotebookSourceService;
use crate::services::{CurrentUser, Services};

pub async fn attach_source(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
    Json(input): Json<NotebookSourceCreate>,
) -> Result<impl IntoResponse, Error> {
    debug!(notebook_id = %notebook_id, source_id = %input.source_id, %user, "POST attach source");
    let (membership, created) = NotebookSourceService::new(&services)
        .attach(&user, notebook_id, input)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(membership)))
}

pub async fn list_notebook_sources(
    State(services): State<Services>,
    user: CurrentUser,
    Path(notebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let response = NotebookSourceService::new(&services)
        .list(&user, notebook_id)
        .await?;
    Ok(Json(response))
}

pub async fn update_position(
    State(services): State<Services>,
    user: CurrentUser,
    Path((notebook_id, source_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<NotebookSourceUpdate>,
) -> Result<impl IntoResponse, Error> {
    let response = NotebookSourceService::new(&services)
        .update_position(&user, notebook_id, source_id, input)
        .await?;
    Ok(Json(response))
}

pub async fn detach_source(
    State(services): State<Services>,
    user: CurrentUser,
    Path((notebook_id, source_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    debug!(notebook_id = %notebook_id, source_id = %source_id, %user, "DELETE detach source");
    let response = NotebookSourceService::new(&services)
        .detach(&user, notebook_id, source_id)
        .await?;
    Ok(Json(response))
}
