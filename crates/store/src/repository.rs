use async_trait::async_trait;
use common::{BatchReference, Sku};
use domain::Product;

use crate::Result;

/// Collection-like access to [`Product`] aggregates inside one unit of work.
///
/// Implementations keep an identity map: every aggregate handed out is
/// tracked as "seen" until the scope ends, and asking for the same SKU twice
/// returns the same instance. The unit of work persists and harvests events
/// from exactly the seen aggregates.
#[async_trait]
pub trait Repository: Send {
    /// Starts tracking a new aggregate.
    ///
    /// Fails with `DuplicateProduct` if the SKU is already tracked or stored.
    async fn add(&mut self, product: Product) -> Result<()>;

    /// Loads the aggregate owning a SKU.
    async fn get<'a>(&'a mut self, sku: &Sku) -> Result<Option<&'a mut Product>>;

    /// Loads the aggregate owning the batch with this reference.
    async fn get_by_batch_reference<'a>(
        &'a mut self,
        reference: &BatchReference,
    ) -> Result<Option<&'a mut Product>>;

    /// Returns every aggregate added or loaded during the current scope, in
    /// the order they were first touched.
    fn seen(&mut self) -> Vec<&mut Product>;
}
