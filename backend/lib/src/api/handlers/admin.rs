//! Superuser-only consistency and cleanup endpoints.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::Error;
use crate::services::reconciler::ReconcilerService;
use crate::services::{Services, Superuser};

fn default_dry_run() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    /// When true (the default) nothing is deleted, only reported.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

pub async fn consistency_check(
    State(services): State<Services>,
    Superuser(user): Superuser,
) -> Result<impl IntoResponse, Error> {
    info!(%user, "Consistency check requested");
    let report = ReconcilerService::new(&services).verify_consistency().await?;
    Ok(Json(json!({
        "message": "Data consistency check completed",
        "report": report,
    })))
}

pub async fn cleanup_orphaned_files(
    State(services): State<Services>,
    Superuser(user): Superuser,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, Error> {
    info!(%user, dry_run = query.dry_run, "Orphaned blob cleanup requested");
    let result = ReconcilerService::new(&services)
        .cleanup_orphaned_objects(query.dry_run)
        .await?;
    Ok(Json(json!({
        "message": "Orphaned files cleanup completed",
        "dry_run": query.dry_run,
        "result": result,
    })))
}

pub async fn cleanup_orphaned_records(
    State(services): State<Services>,
    Superuser(user): Superuser,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, Error> {
    info!(%user, dry_run = query.dry_run, "Orphaned record cleanup requested");
    let result = ReconcilerService::new(&services)
        .cleanup_orphaned_records(query.dry_run)
        .await?;
    Ok(Json(json!({
        "message": "Orphaned records cleanup completed",
        "dry_run": query.dry_run,
        "result": result,
    })))
}

pub async fn cleanup_full(
    State(services): State<Services>,
    Superuser(user): Superuser,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, Error> {
    info!(%user, dry_run = query.dry_run, "Full cleanup requested");
    let result = ReconcilerService::new(&services)
        .run_full_cleanup(query.dry_run)
        .await?;
    Ok(Json(json!({
        "message": "Full cleanup operation completed",
        "dry_run": query.dry_run,
        "result": result,
    })))
}
