//! Handlers for source management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::models::sources::{SourceCreate, SourceListQuery, SourcePublic, SourceUpdate};
use crate::services::sources::{SourceDeleteService, SourceService};
use crate::services::{CurrentUser, Services};

pub async fn create_source(
    State(services): State<Services>,
    user: CurrentUser,
    Json(input): Json<SourceCreate>,
) -> Result<impl IntoResponse, Error> {
    debug!(source_type = ?input.source_type, %user, "POST create source");
    let source = SourceService::new(&services).create(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(SourcePublic::from_source(source, 0)),
    ))
}

pub async fn list_sources(
    State(services): State<Services>,
    user: CurrentUser,
    Query(query): Query<SourceListQuery>,
) -> Result<impl IntoResponse, Error> {
    let response = SourceService::new(&services)
        .list(&user, query.source_type, query.skip, query.limit)
        .await?;
    Ok(Json(response))
}

pub async fn get_source(
    State(services): State<Services>,
    user: CurrentUser,
    Path(source_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let response = SourceService::new(&services).get(&user, source_id).await?;
    Ok(Json(response))
}

pub async fn update_source(
    State(services): State<Services>,
    user: CurrentUser,
    Path(source_id): Path<Uuid>,
    Json(input): Json<SourceUpdate>,
) -> Result<impl IntoResponse, Error> {
    let response = SourceService::new(&services)
        .update(&user, source_id, input)
        .await?;
    Ok(Json(response))
}

pub async fn delete_source(
    State(services): State<Services>,
    user: CurrentUser,
    Path(source_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    debug!(source_id = %source_id, %user, "DELETE source");
    let response = SourceDeleteService::new(&services)
        .delete_source(&user, source_id)
        .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::api::create_app;
    use crate::test_utils::TestContext;

    #[tokio::test]
    async fn create_list_filter_and_delete_sources() {
        let ctx = TestContext::new();
        let server = TestServer::new(create_app(ctx.services.clone())).unwrap();
        let user = ctx.user();
        let token = ctx.token_for(&user);

        let response = server
            .post("/api/v1/sources")
            .authorization_bearer(&token)
            .json(&json!({
                "title": "Example page",
                "source_type": "url",
                "source_metadata": {"url": "https://example.com"},
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["status"], "pending");
        let source_id = created["id"].as_str().unwrap().to_string();

        server
            .post("/api/v1/sources")
            .authorization_bearer(&token)
            .json(&json!({
                "title": "Pasted",
                "source_type": "text",
                "source_metadata": {"content": "pasted text"},
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get("/api/v1/sources")
            .authorization_bearer(&token)
            .await;
        let listed: Value = response.json();
        assert_eq!(listed["count"], 2);

        let response = server
            .get("/api/v1/sources?source_type=url")
            .authorization_bearer(&token)
            .await;
        let listed: Value = response.json();
        assert_eq!(listed["count"], 1);

        let response = server
            .delete(&format!("/api/v1/sources/{source_id}"))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let deleted: Value = response.json();
        assert_eq!(deleted["message"], "Source deleted successfully");
    }

    #[tokio::test]
    async fn invalid_metadata_is_a_400() {
        let ctx = TestContext::new();
        let server = TestServer::new(create_app(ctx.services.clone())).unwrap();
        let token = ctx.token_for(&ctx.user());

        let response = server
            .post("/api/v1/sources")
            .authorization_bearer(&token)
            .json(&json!({
                "title": "broken",
                "source_type": "url",
                "source_metadata": {},
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("url"));
    }

    #[tokio::test]
    async fn foreign_sources_are_hidden() {
        let ctx = TestContext::new();
        let server = TestServer::new(create_app(ctx.services.clone())).unwrap();
        let owner = ctx.user();
        let owner_token = ctx.token_for(&owner);
        let stranger_token = ctx.token_for(&ctx.user());

        let response = server
            .post("/api/v1/sources")
            .authorization_bearer(&owner_token)
            .json(&json!({
                "title": "mine",
                "source_type": "text",
                "source_metadata": {"content": "secret"},
            }))
            .await;
        let source_id = response.json::<Value>()["id"].as_str().unwrap().to_string();

        let response = server
            .get(&format!("/api/v1/sources/{source_id}"))
            .authorization_bearer(&stranger_token)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
