//! Read-only product view.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use common::{BatchReference, OrderId, Sku};
use domain::{Batch, Product};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProductResponse {
    pub sku: Sku,
    pub version: i64,
    pub available: u64,
    pub batches: Vec<BatchView>,
}

#[derive(Serialize)]
pub struct BatchView {
    pub batchref: BatchReference,
    pub eta: Option<NaiveDate>,
    pub purchased: u32,
    pub available: u32,
    pub allocations: Vec<AllocationView>,
}

#[derive(Serialize)]
pub struct AllocationView {
    pub orderid: OrderId,
    pub qty: u32,
}

impl From<&Batch> for BatchView {
    fn from(batch: &Batch) -> Self {
        Self {
            batchref: batch.reference().clone(),
            eta: batch.eta(),
            purchased: batch.purchased_quantity(),
            available: batch.available_quantity(),
            allocations: batch
                .allocations()
                .iter()
                .map(|line| AllocationView {
                    orderid: line.order_id.clone(),
                    qty: line.quantity,
                })
                .collect(),
        }
    }
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.sku().clone(),
            version: product.version().as_i64(),
            available: product.available_quantity(),
            batches: product.batches().iter().map(BatchView::from).collect(),
        }
    }
}

/// GET /products/{sku}: committed state of a product and its batches.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let sku = Sku::from(sku);
    let product = state
        .store
        .product(&sku)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Product {sku} not found")))?;

    Ok(Json(ProductResponse::from(&product)))
}
