//! Product aggregate implementation.

use chrono::NaiveDate;
use common::{BatchReference, Sku, Version};
use serde::{Deserialize, Serialize};

use super::{
    Allocated, AllocationError, AllocationRequired, Batch, BatchCreated, BatchQuantityChanged,
    Event, OrderLine, OutOfStock,
};

/// Product aggregate root.
///
/// Owns every batch of one SKU and is the only path through which those
/// batches are mutated. Each mutation moves the version forward and may
/// record events, which stay pending until drained with [`Product::take_events`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    sku: Sku,

    batches: Vec<Batch>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Events raised since the last drain.
    #[serde(skip)]
    events: Vec<Event>,
}

// Query methods
impl Product {
    /// Creates an empty product for a SKU.
    pub fn new(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            batches: Vec::new(),
            version: Version::initial(),
            events: Vec::new(),
        }
    }

    /// Creates a product from existing batches without raising events.
    ///
    /// # Panics
    ///
    /// Panics if a batch belongs to a different SKU.
    pub fn with_batches(sku: impl Into<Sku>, batches: Vec<Batch>) -> Self {
        let sku = sku.into();
        for batch in &batches {
            assert_eq!(batch.sku(), &sku, "batch {} belongs to another sku", batch.reference());
        }
        Self {
            sku,
            batches,
            version: Version::initial(),
            events: Vec::new(),
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Returns a batch by reference.
    pub fn batch(&self, reference: &BatchReference) -> Option<&Batch> {
        self.batches.iter().find(|b| b.reference() == reference)
    }

    pub fn has_batch(&self, reference: &BatchReference) -> bool {
        self.batch(reference).is_some()
    }

    /// Returns the total available quantity across all batches.
    ///
    /// Widened to `u64`: each batch holds up to `u32::MAX` units.
    pub fn available_quantity(&self) -> u64 {
        self.batches
            .iter()
            .map(|b| u64::from(b.available_quantity()))
            .sum()
    }

    /// Returns the events raised since the last drain without removing them.
    pub fn pending_events(&self) -> &[Event] {
        &self.events
    }

    /// Drains the pending events in the order they were raised.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

// Command methods
impl Product {
    /// Adds a new batch to the product.
    ///
    /// # Panics
    ///
    /// Panics if `sku` is not this product's SKU, or if a batch with the same
    /// reference already exists. Callers pick the product by SKU and check
    /// the reference before adding batches to it.
    pub fn add_batch(
        &mut self,
        reference: impl Into<BatchReference>,
        sku: impl Into<Sku>,
        quantity: u32,
        eta: Option<NaiveDate>,
    ) {
        let sku = sku.into();
        assert_eq!(sku, self.sku, "batch sku does not match product sku");
        let reference = reference.into();
        assert!(
            !self.has_batch(&reference),
            "batch reference {reference} already exists"
        );

        let batch = Batch::new(reference, sku, quantity, eta);
        self.record(BatchCreated {
            reference: batch.reference().clone(),
            sku: batch.sku().clone(),
            quantity,
            eta,
        });
        self.batches.push(batch);
        self.version = self.version.next();
    }

    /// Allocates a line to the preferred eligible batch.
    ///
    /// Warehouse stock wins over shipments and earlier shipments over later
    /// ones. A line that is already allocated stays where it is.
    pub fn allocate(&mut self, line: OrderLine) -> Result<BatchReference, AllocationError> {
        let sku = line.sku.clone();
        self.try_allocate(line)
            .ok_or(AllocationError::OutOfStock { sku })
    }

    /// Allocates a line displaced by a cascade.
    ///
    /// Running out of stock is recorded as an [`OutOfStock`] event instead of
    /// failing, since the change that displaced the line has already happened.
    pub fn reallocate(&mut self, line: OrderLine) -> Option<BatchReference> {
        let sku = line.sku.clone();
        let reference = self.try_allocate(line);
        if reference.is_none() {
            self.record(OutOfStock { sku });
        }
        reference
    }

    /// Removes a line from the named batch. Unallocated lines are ignored.
    pub fn deallocate(
        &mut self,
        reference: &BatchReference,
        line: &OrderLine,
    ) -> Result<(), AllocationError> {
        let batch = self.batch_mut(reference)?;
        if batch.is_allocated(line) {
            batch.deallocate(line);
            self.version = self.version.next();
        }
        Ok(())
    }

    /// Sets the purchased quantity of a batch.
    ///
    /// If the batch ends up over-allocated, lines are evicted oldest first
    /// until it fits, and each evicted line is recorded as an
    /// [`AllocationRequired`] event.
    pub fn change_batch_quantity(
        &mut self,
        reference: &BatchReference,
        quantity: u32,
    ) -> Result<(), AllocationError> {
        let batch = self.batch_mut(reference)?;
        batch.set_purchased_quantity(quantity);
        let evicted = batch.evict_excess();

        if !evicted.is_empty() {
            tracing::debug!(
                sku = %self.sku,
                batch = %reference,
                evicted = evicted.len(),
                "batch shrank below its allocations"
            );
        }

        self.record(BatchQuantityChanged {
            reference: reference.clone(),
            quantity,
        });
        for line in evicted {
            self.record(AllocationRequired::from(line));
        }
        self.version = self.version.next();
        Ok(())
    }
}

// Internal helpers
impl Product {
    fn try_allocate(&mut self, line: OrderLine) -> Option<BatchReference> {
        if let Some(batch) = self.batches.iter().find(|b| b.is_allocated(&line)) {
            return Some(batch.reference().clone());
        }

        let batch = self
            .batches
            .iter_mut()
            .filter(|b| b.can_allocate(&line))
            .min_by(|a, b| a.allocation_priority().cmp(&b.allocation_priority()))?;

        let reference = batch.reference().clone();
        batch.allocate(line.clone());

        self.record(Allocated {
            order_id: line.order_id,
            sku: line.sku,
            quantity: line.quantity,
            batch_reference: reference.clone(),
        });
        self.version = self.version.next();
        Some(reference)
    }

    fn batch_mut(&mut self, reference: &BatchReference) -> Result<&mut Batch, AllocationError> {
        self.batches
            .iter_mut()
            .find(|b| b.reference() == reference)
            .ok_or_else(|| AllocationError::BatchNotFound {
                reference: reference.clone(),
            })
    }

    fn record(&mut self, event: impl Into<Event>) {
        self.events.push(event.into());
    }
}
