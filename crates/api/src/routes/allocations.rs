//! Allocation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::BatchReference;
use domain::Allocate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub orderid: String,
    pub sku: String,
    pub qty: u32,
}

#[derive(Serialize)]
pub struct AllocatedResponse {
    pub batchref: BatchReference,
}

/// POST /allocate: allocate an order line to a batch.
#[tracing::instrument(skip(state))]
pub async fn allocate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AllocateRequest>,
) -> Result<(StatusCode, Json<AllocatedResponse>), ApiError> {
    let results = state
        .message_bus()
        .handle(Allocate::new(req.orderid, req.sku, req.qty).into())
        .await?;

    let batchref = results
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| ApiError::Internal("allocation produced no batch".to_string()))?;

    Ok((StatusCode::CREATED, Json(AllocatedResponse { batchref })))
}
