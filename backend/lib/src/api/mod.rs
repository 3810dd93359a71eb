//! API module for the NotebookHub backend.

pub mod handlers;
pub mod routes;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::log::create_http_trace_layer;
use crate::services::Services;

/// Creates the axum application with all routes and middleware.
pub fn create_app(services: Services) -> Router {
    let body_limit = services.config.limits.max_total_upload_size_bytes;
    let prefix = services.config.api_prefix.clone();

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(false);

    Router::new()
        .route("/health", axum::routing::get(handlers::health_check))
        .nest(&prefix, routes::routes(services))
        .layer(cors)
        .layer(create_http_trace_layer::<axum::body::Body>())
        .layer(DefaultBodyLimit::max(body_limit))
}
