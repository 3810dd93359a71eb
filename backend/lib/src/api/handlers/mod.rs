//! HTTP handlers. Thin adapters: extract, call the service, serialize.

pub mod admin;
pub mod agent;
pub mod messages;
pub mod notebook_sources;
pub mod notebooks;
pub mod search;
pub mod sources;
pub mod uploads;

use axum::Json;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "notebook-hub-backend",
    }))
}
