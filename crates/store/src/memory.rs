use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BatchReference, Sku, Version};
use domain::Product;
use tokio::sync::RwLock;

use crate::{Repository, Result, StoreError, UnitOfWork, UnitOfWorkFactory};

/// In-memory product storage shared by every unit of work created from it.
///
/// Cloning is cheap and yields a handle to the same committed state.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<Sku, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed state of a product.
    pub async fn product(&self, sku: &Sku) -> Option<Product> {
        self.products.read().await.get(sku).cloned()
    }

    /// Returns the number of committed products.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    /// Creates a unit of work over this store.
    pub fn unit_of_work(&self) -> InMemoryUnitOfWork {
        InMemoryUnitOfWork::new(self.clone())
    }
}

impl UnitOfWorkFactory for InMemoryProductStore {
    type UnitOfWork = InMemoryUnitOfWork;

    fn create(&self) -> InMemoryUnitOfWork {
        self.unit_of_work()
    }
}

/// An aggregate handed out during the current scope.
struct Tracked {
    /// Version observed when the aggregate was loaded, `None` if it was added.
    loaded: Option<Version>,
    product: Product,
}

/// Repository over an [`InMemoryProductStore`].
///
/// Loaded aggregates are copies of the committed state; changes become
/// visible to other units of work only when the owning unit of work commits.
pub struct InMemoryRepository {
    store: InMemoryProductStore,
    seen: Vec<Tracked>,
}

impl InMemoryRepository {
    /// Creates a repository over the given store.
    pub fn new(store: InMemoryProductStore) -> Self {
        Self {
            store,
            seen: Vec::new(),
        }
    }

    fn position(&self, predicate: impl Fn(&Product) -> bool) -> Option<usize> {
        self.seen.iter().position(|tracked| predicate(&tracked.product))
    }

    fn track(&mut self, loaded: Option<Version>, product: Product) -> &mut Product {
        let index = self.seen.len();
        self.seen.push(Tracked { loaded, product });
        &mut self.seen[index].product
    }

    fn forget(&mut self) {
        self.seen.clear();
    }

    /// Writes every seen aggregate back to the store if none of them was
    /// changed by someone else since it was loaded.
    async fn persist(&mut self) -> Result<()> {
        let mut committed = self.store.products.write().await;

        for tracked in &self.seen {
            let sku = tracked.product.sku();
            let actual = committed.get(sku).map(Product::version);
            if actual != tracked.loaded {
                return Err(StoreError::ConcurrencyConflict {
                    sku: sku.clone(),
                    expected: tracked.loaded.unwrap_or_default(),
                    actual: actual.unwrap_or_default(),
                });
            }
        }

        for tracked in &mut self.seen {
            // Stored copies never carry pending events.
            let mut stored = tracked.product.clone();
            stored.take_events();
            tracked.loaded = Some(stored.version());
            committed.insert(stored.sku().clone(), stored);
        }

        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn add(&mut self, product: Product) -> Result<()> {
        let sku = product.sku().clone();
        let exists = self.position(|p| p.sku() == &sku).is_some()
            || self.store.products.read().await.contains_key(&sku);
        if exists {
            return Err(StoreError::DuplicateProduct { sku });
        }

        self.track(None, product);
        Ok(())
    }

    async fn get<'a>(&'a mut self, sku: &Sku) -> Result<Option<&'a mut Product>> {
        if let Some(index) = self.position(|p| p.sku() == sku) {
            return Ok(Some(&mut self.seen[index].product));
        }

        let stored = self.store.products.read().await.get(sku).cloned();
        match stored {
            Some(product) => Ok(Some(self.track(Some(product.version()), product))),
            None => Ok(None),
        }
    }

    async fn get_by_batch_reference<'a>(
        &'a mut self,
        reference: &BatchReference,
    ) -> Result<Option<&'a mut Product>> {
        if let Some(index) = self.position(|p| p.has_batch(reference)) {
            return Ok(Some(&mut self.seen[index].product));
        }

        let stored = self
            .store
            .products
            .read()
            .await
            .values()
            .find(|p| p.has_batch(reference))
            .cloned();

        match stored {
            // A tracked copy without the batch is authoritative for this scope.
            Some(product) if self.position(|p| p.sku() == product.sku()).is_some() => Ok(None),
            Some(product) => Ok(Some(self.track(Some(product.version()), product))),
            None => Ok(None),
        }
    }

    fn seen(&mut self) -> Vec<&mut Product> {
        self.seen
            .iter_mut()
            .map(|tracked| &mut tracked.product)
            .collect()
    }
}

/// Unit of work over an [`InMemoryProductStore`].
pub struct InMemoryUnitOfWork {
    products: InMemoryRepository,
    commits: usize,
    rollbacks: usize,
}

impl InMemoryUnitOfWork {
    /// Creates a unit of work over the given store.
    pub fn new(store: InMemoryProductStore) -> Self {
        Self {
            products: InMemoryRepository::new(store),
            commits: 0,
            rollbacks: 0,
        }
    }

    /// Returns the store this unit of work writes to.
    pub fn store(&self) -> &InMemoryProductStore {
        &self.products.store
    }

    /// Returns true once at least one scope has been committed.
    pub fn committed(&self) -> bool {
        self.commits > 0
    }

    /// Returns the number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Returns the number of rollbacks.
    pub fn rollback_count(&self) -> usize {
        self.rollbacks
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Products = InMemoryRepository;

    fn products(&mut self) -> &mut InMemoryRepository {
        &mut self.products
    }

    async fn begin(&mut self) -> Result<()> {
        self.products.forget();
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        match self.products.persist().await {
            Ok(()) => {
                self.commits += 1;
                metrics::counter!("uow_commits_total").increment(1);
                Ok(())
            }
            Err(e) => {
                if let StoreError::ConcurrencyConflict { sku, .. } = &e {
                    tracing::warn!(%sku, "concurrent modification detected on commit");
                    metrics::counter!("uow_conflicts_total").increment(1);
                }
                Err(e)
            }
        }
    }

    fn rollback(&mut self) {
        self.products.forget();
        self.rollbacks += 1;
        metrics::counter!("uow_rollbacks_total").increment(1);
    }
}
