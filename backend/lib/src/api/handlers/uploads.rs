//! Handlers for the file upload and document management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Multipart;
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::models::documents::PresignQuery;
use crate::models::Pagination;
use crate::services::documents::{DocumentService, FileDeleteService};
use crate::services::uploads::{FileUploadService, UploadedFile};
use crate::services::{CurrentUser, Services};

pub async fn upload_files(
    State(services): State<Services>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Error> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to parse multipart field: {e}")))?
    {
        // Only file fields carry a filename; other fields are ignored.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read file data: {e}")))?;
        files.push(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(Error::BadRequest("No files provided".to_string()));
    }

    debug!(count = files.len(), %user, "POST upload files");
    let response = FileUploadService::new(&services)
        .upload_batch(&user, files)
        .await?;
    Ok((StatusCode::OK, Json(response)))
}

pub async fn list_documents(
    State(services): State<Services>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, Error> {
    let response = DocumentService::new(&services).list(&user, page).await?;
    Ok(Json(response))
}

pub async fn get_document(
    State(services): State<Services>,
    user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let response = DocumentService::new(&services).get(&user, document_id).await?;
    Ok(Json(response))
}

pub async fn delete_document(
    State(services): State<Services>,
    user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    debug!(document_id = %document_id, %user, "DELETE document");
    let response = FileDeleteService::new(&services)
        .delete_document(&user, document_id)
        .await?;
    Ok(Json(response))
}

pub async fn delete_documents(
    State(services): State<Services>,
    user: CurrentUser,
    Json(document_ids): Json<Vec<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    debug!(count = document_ids.len(), %user, "DELETE documents batch");
    let response = FileDeleteService::new(&services)
        .delete_batch(&user, document_ids)
        .await?;
    Ok(Json(response))
}

pub async fn presign(
    State(services): State<Services>,
    user: CurrentUser,
    Query(query): Query<PresignQuery>,
) -> Result<impl IntoResponse, Error> {
    let response = DocumentService::new(&services)
        .presign(&user, &query.key, query.expires_minutes)
        .await?;
    Ok(Json(response))
}
