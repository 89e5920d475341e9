//! Retrieval endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use std::time::Instant;
use uuid::Uuid;

use crate::error::Result;
use crate::retrieval::assemble_context;
use crate::server::state::AppState;
use crate::types::{RetrieveRequest, RetrieveResponse};

/// POST /api/users/:user_id/retrieve - Retrieve ranked passages for a query
pub async fn retrieve(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>> {
    let start = Instant::now();

    tracing::info!(
        "Retrieve for user {}: \"{}\" (top_k: {})",
        user_id,
        request.query,
        request.top_k
    );

    let passages = state
        .retriever()
        .retrieve(&user_id, &request.query, request.top_k)
        .await?;

    let context = request
        .include_context
        .then(|| assemble_context(&passages));

    let processing_time_ms = start.elapsed().as_millis() as u64;

    Ok(Json(RetrieveResponse::new(
        passages,
        context,
        processing_time_ms,
    )))
}
