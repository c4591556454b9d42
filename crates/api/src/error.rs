//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::AllocationError;
use service::ServiceError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Message handling error.
    Service(ServiceError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Service(err) => service_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    match &err {
        ServiceError::InvalidSku(_)
        | ServiceError::Allocation(AllocationError::OutOfStock { .. }) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        ServiceError::UnknownBatch(_)
        | ServiceError::Allocation(AllocationError::BatchNotFound { .. }) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ServiceError::DuplicateBatch(_)
        | ServiceError::Store(StoreError::ConcurrencyConflict { .. })
        | ServiceError::Store(StoreError::DuplicateProduct { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        ServiceError::Notification(_) => {
            tracing::error!(error = %err, "notification failure reached the api");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Version;

    #[test]
    fn test_out_of_stock_is_bad_request() {
        let err = ServiceError::Allocation(AllocationError::OutOfStock { sku: "LAMP".into() });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_batch_is_not_found() {
        let response = ApiError::from(ServiceError::UnknownBatch("b9".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_batch_is_conflict() {
        let response = ApiError::from(ServiceError::DuplicateBatch("b1".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = ServiceError::Store(StoreError::ConcurrencyConflict {
            sku: "LAMP".into(),
            expected: Version::new(1),
            actual: Version::new(2),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
