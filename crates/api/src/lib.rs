//! HTTP API server with observability for the allocation service.
//!
//! Every request is turned into a command and handed to a fresh
//! [`MessageBus`](service::MessageBus), with structured logging (tracing)
//! and Prometheus metrics around it.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, create_default_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/batches", post(routes::batches::create))
        .route(
            "/batches/{reference}/quantity",
            post(routes::batches::change_quantity),
        )
        .route("/allocate", post(routes::allocations::allocate))
        .route("/products/{sku}", get(routes::products::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
