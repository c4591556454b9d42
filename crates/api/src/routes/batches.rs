//! Batch endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::BatchReference;
use domain::{ChangeBatchQuantity, CreateBatch};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    pub sku: String,
    pub qty: u32,
    #[serde(default)]
    pub eta: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeQuantityRequest {
    pub qty: u32,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub batchref: BatchReference,
}

#[derive(Serialize)]
pub struct QuantityChangedResponse {
    pub batchref: BatchReference,
    pub qty: u32,
}

/// POST /batches: add a batch, generating a reference if none is given.
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError> {
    let reference = req
        .reference
        .map(BatchReference::from)
        .unwrap_or_else(BatchReference::generate);

    state
        .message_bus()
        .handle(CreateBatch::new(reference.clone(), req.sku, req.qty, req.eta).into())
        .await?;

    Ok((StatusCode::CREATED, Json(BatchResponse { batchref: reference })))
}

/// POST /batches/{reference}/quantity: change a batch's purchased quantity.
#[tracing::instrument(skip(state))]
pub async fn change_quantity(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(req): Json<ChangeQuantityRequest>,
) -> Result<Json<QuantityChangedResponse>, ApiError> {
    let reference = BatchReference::from(reference);

    state
        .message_bus()
        .handle(ChangeBatchQuantity::new(reference.clone(), req.qty).into())
        .await?;

    Ok(Json(QuantityChangedResponse {
        batchref: reference,
        qty: req.qty,
    }))
}
