//! Service error types.

use common::{BatchReference, Sku};
use domain::AllocationError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while handling a message.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No product exists for the requested SKU.
    #[error("Invalid sku {0}")]
    InvalidSku(Sku),

    /// No product owns a batch with this reference.
    #[error("Unknown batch {0}")]
    UnknownBatch(BatchReference),

    /// A batch with this reference already exists, under any SKU.
    #[error("Batch {0} already exists")]
    DuplicateBatch(BatchReference),

    /// The domain model rejected the operation.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The unit of work failed to load or persist.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A notification could not be delivered.
    #[error("Notification failed: {0}")]
    Notification(String),
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
