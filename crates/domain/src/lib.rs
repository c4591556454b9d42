//! Domain layer for the allocation service.
//!
//! This crate provides the pure allocation model:
//! - [`OrderLine`] value object and [`Batch`] entity
//! - [`Product`] aggregate, the consistency boundary for a SKU
//! - Commands and events exchanged through the message bus
//!
//! Nothing in here performs I/O. Aggregates accumulate the events they raise
//! until the unit of work drains them with [`Product::take_events`].

pub mod allocation;
pub mod message;

pub use allocation::{
    Allocate, Allocated, AllocationError, AllocationRequired, Batch, BatchCreated,
    BatchQuantityChanged, ChangeBatchQuantity, Command, CreateBatch, Event, OrderLine, OutOfStock,
    Product,
};
pub use common::{BatchReference, OrderId, Sku, Version};
pub use message::Message;
