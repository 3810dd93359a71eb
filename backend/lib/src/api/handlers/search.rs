//! Handlers for vector search.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::error::Error;
use crate::models::search::SearchQuery;
use crate::services::search::SearchService;
use crate::services::{CurrentUser, Services};

pub async fn search_documents(
    State(services): State<Services>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, Error> {
    let response = SearchService::new(&services).search(&user, query).await?;
    Ok(Json(response))
}

pub async fn search_health(
    State(services): State<Services>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, Error> {
    let response = SearchService::new(&services).health().await;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use nh_vector_store::LogicalId;
    use serde_json::Value;
    use uuid::Uuid;

    use crate::api::create_app;
    use crate::test_utils::TestContext;

    #[tokio::test]
    async fn search_returns_owned_results() {
        let ctx = TestContext::new();
        let server = TestServer::new(create_app(ctx.services.clone())).unwrap();
        let user = ctx.user();
        let token = ctx.token_for(&user);

        ctx.index_text(
            LogicalId::Document(Uuid::now_v7()),
            user.id,
            "quarterly revenue grew strongly",
        )
        .await;

        let response = server
            .get("/api/v1/search/documents?query=quarterly%20revenue&score_threshold=0.1")
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let json: Value = response.json();
        assert_eq!(json["total"], 1);
        assert_eq!(json["query"], "quarterly revenue");
    }

    #[tokio::test]
    async fn health_endpoint_reports_components() {
        let ctx = TestContext::new();
        let server = TestServer::new(create_app(ctx.services.clone())).unwrap();
        let token = ctx.token_for(&ctx.user());

        let response = server
            .get("/api/v1/search/health")
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let json: Value = response.json();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["qdrant"]["connected"], true);
    }
}
