use common::{Sku, Version};
use thiserror::Error;

/// Errors that can occur when interacting with the product store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another transaction committed a newer version of the product first.
    #[error(
        "Concurrency conflict for product {sku}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        sku: Sku,
        expected: Version,
        actual: Version,
    },

    /// A product with this SKU is already tracked or stored.
    #[error("Product already exists: {sku}")]
    DuplicateProduct { sku: Sku },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
