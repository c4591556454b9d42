//! Allocation aggregate and related types.

mod batch;
mod commands;
mod events;
mod order_line;
mod product;

pub use batch::Batch;
pub use commands::{Allocate, ChangeBatchQuantity, Command, CreateBatch};
pub use events::{
    Allocated, AllocationRequired, BatchCreated, BatchQuantityChanged, Event, OutOfStock,
};
pub use order_line::OrderLine;
pub use product::Product;

use common::{BatchReference, Sku};
use thiserror::Error;

/// Errors that can occur during allocation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// No batch of the SKU can take the requested quantity.
    #[error("Out of stock for sku {sku}")]
    OutOfStock { sku: Sku },

    /// The product has no batch with this reference.
    #[error("Batch not found: {reference}")]
    BatchNotFound { reference: BatchReference },
}
