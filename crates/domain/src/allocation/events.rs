//! Allocation domain events.

use chrono::NaiveDate;
use common::{BatchReference, OrderId, Sku};
use serde::{Deserialize, Serialize};

use super::OrderLine;

/// Notifications of something that happened to a product.
///
/// Any number of handlers may observe each variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// No batch could take an order line.
    OutOfStock(OutOfStock),

    /// An order line needs (re-)allocation.
    AllocationRequired(AllocationRequired),

    /// An order line was allocated to a batch.
    Allocated(Allocated),

    /// A batch was added to a product.
    BatchCreated(BatchCreated),

    /// A batch's purchased quantity was changed.
    BatchQuantityChanged(BatchQuantityChanged),
}

impl Event {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::OutOfStock(_) => "OutOfStock",
            Event::AllocationRequired(_) => "AllocationRequired",
            Event::Allocated(_) => "Allocated",
            Event::BatchCreated(_) => "BatchCreated",
            Event::BatchQuantityChanged(_) => "BatchQuantityChanged",
        }
    }
}

/// Data for OutOfStock event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    /// The SKU that ran out.
    pub sku: Sku,
}

/// Data for AllocationRequired event.
///
/// Raised when a batch shrinks and displaces a line, and accepted as an
/// external trigger for allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequired {
    pub order_id: OrderId,
    pub sku: Sku,
    pub quantity: u32,
}

impl AllocationRequired {
    /// Returns the order line to allocate.
    pub fn line(&self) -> OrderLine {
        OrderLine::new(self.order_id.clone(), self.sku.clone(), self.quantity)
    }
}

impl From<OrderLine> for AllocationRequired {
    fn from(line: OrderLine) -> Self {
        Self {
            order_id: line.order_id,
            sku: line.sku,
            quantity: line.quantity,
        }
    }
}

/// Data for Allocated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocated {
    pub order_id: OrderId,
    pub sku: Sku,
    pub quantity: u32,

    /// The batch that received the line.
    pub batch_reference: BatchReference,
}

/// Data for BatchCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCreated {
    pub reference: BatchReference,
    pub sku: Sku,
    pub quantity: u32,
    pub eta: Option<NaiveDate>,
}

/// Data for BatchQuantityChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuantityChanged {
    pub reference: BatchReference,

    /// New purchased quantity.
    pub quantity: u32,
}

impl From<OutOfStock> for Event {
    fn from(data: OutOfStock) -> Self {
        Event::OutOfStock(data)
    }
}

impl From<AllocationRequired> for Event {
    fn from(data: AllocationRequired) -> Self {
        Event::AllocationRequired(data)
    }
}

impl From<Allocated> for Event {
    fn from(data: Allocated) -> Self {
        Event::Allocated(data)
    }
}

impl From<BatchCreated> for Event {
    fn from(data: BatchCreated) -> Self {
        Event::BatchCreated(data)
    }
}

impl From<BatchQuantityChanged> for Event {
    fn from(data: BatchQuantityChanged) -> Self {
        Event::BatchQuantityChanged(data)
    }
}
