//! Command and event handlers.
//!
//! Every handler opens its own [`Transaction`], so each one commits or rolls
//! back independently of the others.

use std::sync::Arc;

use async_trait::async_trait;
use common::BatchReference;
use domain::{Allocate, AllocationRequired, ChangeBatchQuantity, CreateBatch, OutOfStock, Product};
use store::{Repository, Transaction, UnitOfWork};

use crate::error::{Result, ServiceError};
use crate::notifications::Notifications;

/// A handler reacting to one kind of event.
///
/// Handlers are registered per event variant in
/// [`EventHandlers`](crate::EventHandlers); a failing handler is retried and
/// then skipped without affecting its siblings.
#[async_trait]
pub trait EventHandler<E, U>: Send + Sync
where
    E: Send + Sync,
    U: UnitOfWork,
{
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Handles one event inside the given unit of work.
    async fn handle(&self, event: &E, uow: &mut U) -> Result<()>;
}

/// Creates a batch, creating its product first if this is a new SKU.
///
/// Batch references are unique across all products; reusing one fails with
/// [`ServiceError::DuplicateBatch`].
#[tracing::instrument(skip(uow), fields(sku = %command.sku, batch = %command.reference))]
pub async fn add_batch<U: UnitOfWork>(command: CreateBatch, uow: &mut U) -> Result<()> {
    let mut tx = Transaction::begin(uow).await?;
    let products = tx.products();

    if products
        .get_by_batch_reference(&command.reference)
        .await?
        .is_some()
    {
        return Err(ServiceError::DuplicateBatch(command.reference));
    }
    if products.get(&command.sku).await?.is_none() {
        tracing::debug!("creating product for new sku");
        products.add(Product::new(command.sku.clone())).await?;
    }
    let product = products
        .get(&command.sku)
        .await?
        .ok_or_else(|| ServiceError::InvalidSku(command.sku.clone()))?;
    product.add_batch(command.reference, command.sku, command.quantity, command.eta);

    tx.commit().await?;
    Ok(())
}

/// Allocates an order line and returns the chosen batch.
///
/// Fails with [`ServiceError::InvalidSku`] if no product exists for the SKU,
/// or with an out-of-stock error if no batch can take the line. Either way
/// nothing is committed.
#[tracing::instrument(skip(uow), fields(order_id = %command.order_id, sku = %command.sku))]
pub async fn allocate<U: UnitOfWork>(command: Allocate, uow: &mut U) -> Result<BatchReference> {
    let line = command.line();
    let mut tx = Transaction::begin(uow).await?;

    let product = tx
        .products()
        .get(&line.sku)
        .await?
        .ok_or_else(|| ServiceError::InvalidSku(line.sku.clone()))?;

    let reference = match product.allocate(line) {
        Ok(reference) => reference,
        Err(e) => {
            metrics::counter!("out_of_stock_total").increment(1);
            return Err(e.into());
        }
    };

    tx.commit().await?;
    metrics::counter!("allocations_total").increment(1);
    tracing::info!(batch = %reference, "allocated order line");
    Ok(reference)
}

/// Changes the purchased quantity of a batch.
///
/// Lines displaced by the change are raised as `AllocationRequired` events
/// and reallocated by [`Reallocate`] once this transaction has committed.
#[tracing::instrument(skip(uow), fields(batch = %command.reference, quantity = command.quantity))]
pub async fn change_batch_quantity<U: UnitOfWork>(
    command: ChangeBatchQuantity,
    uow: &mut U,
) -> Result<()> {
    let mut tx = Transaction::begin(uow).await?;

    let product = tx
        .products()
        .get_by_batch_reference(&command.reference)
        .await?
        .ok_or_else(|| ServiceError::UnknownBatch(command.reference.clone()))?;
    product.change_batch_quantity(&command.reference, command.quantity)?;

    tx.commit().await?;
    Ok(())
}

/// Reallocates a line that was displaced from its batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reallocate;

#[async_trait]
impl<U: UnitOfWork + 'static> EventHandler<AllocationRequired, U> for Reallocate {
    fn name(&self) -> &'static str {
        "reallocate"
    }

    async fn handle(&self, event: &AllocationRequired, uow: &mut U) -> Result<()> {
        let line = event.line();
        let mut tx = Transaction::begin(uow).await?;

        let product = tx
            .products()
            .get(&line.sku)
            .await?
            .ok_or_else(|| ServiceError::InvalidSku(line.sku.clone()))?;

        match product.reallocate(line) {
            Some(reference) => {
                metrics::counter!("allocations_total").increment(1);
                tracing::info!(
                    order_id = %event.order_id,
                    batch = %reference,
                    "reallocated order line"
                );
            }
            None => {
                metrics::counter!("out_of_stock_total").increment(1);
                tracing::warn!(
                    order_id = %event.order_id,
                    sku = %event.sku,
                    "no batch left for displaced order line"
                );
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Tells the stock team that a SKU ran out.
#[derive(Clone)]
pub struct SendOutOfStockNotification {
    notifications: Arc<dyn Notifications>,
    recipient: String,
}

impl SendOutOfStockNotification {
    pub fn new(notifications: Arc<dyn Notifications>, recipient: impl Into<String>) -> Self {
        Self {
            notifications,
            recipient: recipient.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> EventHandler<OutOfStock, U> for SendOutOfStockNotification {
    fn name(&self) -> &'static str {
        "send_out_of_stock_notification"
    }

    async fn handle(&self, event: &OutOfStock, _uow: &mut U) -> Result<()> {
        self.notifications
            .send(&self.recipient, &format!("Out of stock for {}", event.sku))
            .await
    }
}
