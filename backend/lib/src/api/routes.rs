//! Route definitions for the NotebookHub API.

use axum::routing::{get, post, put};
use axum::Router;

use super::handlers;
use crate::services::Services;

/// All routes under the configured API prefix.
pub fn routes(services: Services) -> Router {
    Router::new()
        // Uploaded files and their documents
        .route("/uploads/files", post(handlers::uploads::upload_files))
        .route(
            "/uploads/documents",
            get(handlers::uploads::list_documents).delete(handlers::uploads::delete_documents),
        )
        .route(
            "/uploads/documents/{document_id}",
            get(handlers::uploads::get_document).delete(handlers::uploads::delete_document),
        )
        .route("/uploads/presign", get(handlers::uploads::presign))
        // Superuser consistency tooling
        .route(
            "/uploads/consistency-check",
            get(handlers::admin::consistency_check),
        )
        .route(
            "/uploads/cleanup/orphaned-files",
            post(handlers::admin::cleanup_orphaned_files),
        )
        .route(
            "/uploads/cleanup/orphaned-records",
            post(handlers::admin::cleanup_orphaned_records),
        )
        .route("/uploads/cleanup/full", post(handlers::admin::cleanup_full))
        // Sources
        .route(
            "/sources",
            get(handlers::sources::list_sources).post(handlers::sources::create_source),
        )
        .route(
            "/sources/{source_id}",
            get(handlers::sources::get_source)
                .put(handlers::sources::update_source)
                .delete(handlers::sources::delete_source),
        )
        // Notebooks
        .route(
            "/notebooks",
            get(handlers::notebooks::list_notebooks).post(handlers::notebooks::create_notebook),
        )
        .route(
            "/notebooks/{notebook_id}",
            get(handlers::notebooks::get_notebook)
                .put(handlers::notebooks::update_notebook)
                .delete(handlers::notebooks::delete_notebook),
        )
        // Notebook membership
        .route(
            "/notebooks/{notebook_id}/sources",
            get(handlers::notebook_sources::list_notebook_sources)
                .post(handlers::notebook_sources::attach_source),
        )
        .route(
            "/notebooks/{notebook_id}/sources/{source_id}",
            put(handlers::notebook_sources::update_position)
                .delete(handlers::notebook_sources::detach_source),
        )
        // Notebook messages
        .route(
            "/notebooks/{notebook_id}/messages",
            get(handlers::messages::list_messages).post(handlers::messages::create_message),
        )
        // Search
        .route("/search/documents", get(handlers::search::search_documents))
        .route("/search/health", get(handlers::search::search_health))
        // Retrieval tool for the agent runtime
        .route("/agent/retrieve", post(handlers::agent::retrieve))
        .with_state(services)
}

// Handler-level behavior is covered by the tests in `crate::api::handlers`
// and the service modules; this module only wires paths.
#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::test_utils::TestContext;

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let ctx = TestContext::new();
        let server = TestServer::new(crate::api::create_app(ctx.services.clone())).unwrap();
        let response = server.get("/api/v1/nope").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_routes_require_authentication() {
        let ctx = TestContext::new();
        let server = TestServer::new(crate::api::create_app(ctx.services.clone())).unwrap();
        let response = server.get("/api/v1/notebooks").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}
