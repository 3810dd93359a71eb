//! Retrieval tool endpoint for the external agent runtime.
//!
//! The chat agent itself (prompting, streaming, tool-call policy) runs in
//! a separate service; it calls this endpoint when it decides to look
//! something up. Selected sources travel inside the conversation, as a
//! system message following the selected-sources convention.

use axum::{extract::State, response::IntoResponse, Json};
use tracing::debug;

use crate::error::Error;
use crate::models::agent::{RetrieveRequest, RetrieveResponse};
use crate::services::retrieval::{parse_selected_sources, RetrievalService};
use crate::services::{CurrentUser, Services};

pub async fn retrieve(
    State(services): State<Services>,
    user: CurrentUser,
    Json(request): Json<RetrieveRequest>,
) -> Result<impl IntoResponse, Error> {
    let selected = parse_selected_sources(&request.messages);
    debug!(
        %user,
        selected = selected.len(),
        top_k = request.top_k,
        "POST agent retrieve"
    );

    let result = RetrievalService::new(&services)
        .look_up_sources(&user, &request.query, request.top_k, &selected)
        .await?;
    Ok(Json(RetrieveResponse { result }))
}
