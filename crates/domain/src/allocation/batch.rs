//! Batch entity.

use chrono::NaiveDate;
use common::{BatchReference, Sku};
use serde::{Deserialize, Serialize};

use super::OrderLine;

/// A purchased or incoming quantity of a SKU.
///
/// Batches without an `eta` are already in the warehouse; batches with an
/// `eta` are shipments still on their way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    reference: BatchReference,
    sku: Sku,
    purchased_quantity: u32,
    eta: Option<NaiveDate>,

    /// Allocated lines in the order they were allocated. Never holds duplicates.
    allocations: Vec<OrderLine>,
}

impl PartialEq for Batch {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for Batch {}

impl Batch {
    /// Creates a new batch with no allocations.
    pub fn new(
        reference: impl Into<BatchReference>,
        sku: impl Into<Sku>,
        purchased_quantity: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            purchased_quantity,
            eta,
            allocations: Vec::new(),
        }
    }

    pub fn reference(&self) -> &BatchReference {
        &self.reference
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    /// Returns the allocated lines, oldest first.
    pub fn allocations(&self) -> &[OrderLine] {
        &self.allocations
    }

    /// Returns the total quantity allocated to this batch.
    pub fn allocated_quantity(&self) -> u32 {
        self.allocations.iter().map(|line| line.quantity).sum()
    }

    /// Returns the quantity still free for allocation.
    pub fn available_quantity(&self) -> u32 {
        self.purchased_quantity
            .saturating_sub(self.allocated_quantity())
    }

    /// Returns true if the line is currently allocated to this batch.
    pub fn is_allocated(&self, line: &OrderLine) -> bool {
        self.allocations.contains(line)
    }

    /// Returns true if the SKU matches and there is enough room for the line.
    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == line.sku && self.available_quantity() >= line.quantity
    }

    /// Records an allocation. Allocating a line twice has no further effect.
    pub fn allocate(&mut self, line: OrderLine) {
        if !self.is_allocated(&line) {
            self.allocations.push(line);
        }
    }

    /// Removes an allocation. Lines that were never allocated are ignored.
    pub fn deallocate(&mut self, line: &OrderLine) {
        self.allocations.retain(|allocated| allocated != line);
    }

    /// Sort key used to choose between eligible batches.
    ///
    /// Warehouse stock (`None`) sorts before any shipment, earlier shipments
    /// before later ones, and the reference breaks ties.
    pub fn allocation_priority(&self) -> (Option<NaiveDate>, &BatchReference) {
        (self.eta, &self.reference)
    }

    pub(crate) fn set_purchased_quantity(&mut self, quantity: u32) {
        self.purchased_quantity = quantity;
    }

    /// Removes allocations, oldest first, until the batch is no longer
    /// over-allocated. Returns the evicted lines in eviction order.
    pub(crate) fn evict_excess(&mut self) -> Vec<OrderLine> {
        let mut evicted = Vec::new();
        while self.allocated_quantity() > self.purchased_quantity && !self.allocations.is_empty() {
            evicted.push(self.allocations.remove(0));
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, Utc};

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn make_batch_and_line(sku: &str, batch_qty: u32, line_qty: u32) -> (Batch, OrderLine) {
        (
            Batch::new("batch-001", sku, batch_qty, Some(today())),
            OrderLine::new("order-123", sku, line_qty),
        )
    }

    #[test]
    fn allocating_reduces_available_quantity() {
        let mut batch = Batch::new("batch-001", "SMALL-TABLE", 20, Some(today()));
        batch.allocate(OrderLine::new("order-ref", "SMALL-TABLE", 2));
        assert_eq!(batch.available_quantity(), 18);
    }

    #[test]
    fn can_allocate_if_available_greater_than_required() {
        let (batch, line) = make_batch_and_line("ELEGANT-LAMP", 20, 2);
        assert!(batch.can_allocate(&line));
    }

    #[test]
    fn cannot_allocate_if_available_smaller_than_required() {
        let (batch, line) = make_batch_and_line("ELEGANT-LAMP", 2, 20);
        assert!(!batch.can_allocate(&line));
    }

    #[test]
    fn can_allocate_if_available_equal_to_required() {
        let (batch, line) = make_batch_and_line("ELEGANT-LAMP", 2, 2);
        assert!(batch.can_allocate(&line));
    }

    #[test]
    fn cannot_allocate_if_skus_do_not_match() {
        let batch = Batch::new("batch-001", "UNCOMFORTABLE-CHAIR", 100, None);
        let line = OrderLine::new("order-123", "EXPENSIVE-TOASTER", 10);
        assert!(!batch.can_allocate(&line));
    }

    #[test]
    fn can_only_deallocate_allocated_lines() {
        let (mut batch, unallocated) = make_batch_and_line("DECORATIVE-TRINKET", 20, 2);
        batch.deallocate(&unallocated);
        assert_eq!(batch.available_quantity(), 20);
    }

    #[test]
    fn deallocate_restores_quantity() {
        let (mut batch, line) = make_batch_and_line("DECORATIVE-TRINKET", 20, 2);
        batch.allocate(line.clone());
        batch.deallocate(&line);
        assert_eq!(batch.available_quantity(), 20);
        assert!(!batch.is_allocated(&line));
    }

    #[test]
    fn allocation_is_idempotent() {
        let (mut batch, line) = make_batch_and_line("ANGULAR-DESK", 20, 2);
        for _ in 0..5 {
            batch.allocate(line.clone());
        }
        assert_eq!(batch.available_quantity(), 18);
        assert_eq!(batch.allocations().len(), 1);
    }

    #[test]
    fn warehouse_stock_has_priority_over_shipments() {
        let warehouse = Batch::new("zzz-warehouse", "RETRO-CLOCK", 100, None);
        let shipment = Batch::new(
            "aaa-shipment",
            "RETRO-CLOCK",
            100,
            today().checked_add_days(Days::new(1)),
        );
        assert!(warehouse.allocation_priority() < shipment.allocation_priority());
    }

    #[test]
    fn reference_breaks_eta_ties() {
        let a = Batch::new("batch-a", "RETRO-CLOCK", 100, Some(today()));
        let b = Batch::new("batch-b", "RETRO-CLOCK", 100, Some(today()));
        assert!(a.allocation_priority() < b.allocation_priority());
    }

    #[test]
    fn evict_excess_removes_oldest_lines_first() {
        let mut batch = Batch::new("batch-001", "BLUE-VASE", 50, None);
        let first = OrderLine::new("order-1", "BLUE-VASE", 20);
        let second = OrderLine::new("order-2", "BLUE-VASE", 20);
        batch.allocate(first.clone());
        batch.allocate(second.clone());

        batch.set_purchased_quantity(25);
        let evicted = batch.evict_excess();

        assert_eq!(evicted, vec![first]);
        assert!(batch.is_allocated(&second));
        assert_eq!(batch.available_quantity(), 5);
    }

    #[test]
    fn batches_are_equal_by_reference() {
        let a = Batch::new("batch-001", "SKU-A", 10, None);
        let b = Batch::new("batch-001", "SKU-A", 99, Some(today()));
        assert_eq!(a, b);
    }
}
