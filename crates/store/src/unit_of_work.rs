//! Transactional scope around a repository.

use async_trait::async_trait;
use domain::Event;

use crate::{Repository, Result};

/// A transaction bound to one repository.
///
/// Units of work never commit on their own: a handler opens a scope with
/// [`Transaction::begin`], mutates aggregates through
/// [`Transaction::products`] and calls [`Transaction::commit`]. Anything not
/// committed is rolled back.
#[async_trait]
pub trait UnitOfWork: Send {
    /// The repository bound to this unit of work.
    type Products: Repository;

    /// Returns the repository for the current scope.
    fn products(&mut self) -> &mut Self::Products;

    /// Opens a fresh scope. Aggregates tracked by a previous scope are
    /// forgotten.
    async fn begin(&mut self) -> Result<()>;

    /// Persists every aggregate seen in the scope atomically.
    async fn commit(&mut self) -> Result<()>;

    /// Discards every change made in the scope, including pending events.
    fn rollback(&mut self);

    /// Drains the pending events of every seen aggregate.
    ///
    /// Events come out in the order aggregates were first touched, and in
    /// the order each aggregate raised them. Each event is returned once.
    fn collect_new_events(&mut self) -> Vec<Event> {
        self.products()
            .seen()
            .into_iter()
            .flat_map(|product| product.take_events())
            .collect()
    }
}

/// Produces a fresh unit of work for every top-level request.
pub trait UnitOfWorkFactory: Send + Sync {
    type UnitOfWork: UnitOfWork;

    fn create(&self) -> Self::UnitOfWork;
}

/// Guard over an open unit-of-work scope.
///
/// Exactly one of commit or rollback takes effect: [`Transaction::commit`]
/// commits (rolling back if the commit itself fails), and dropping the guard
/// without committing rolls back. Early returns with `?` are therefore safe.
pub struct Transaction<'a, U: UnitOfWork> {
    uow: &'a mut U,
    finished: bool,
}

impl<'a, U: UnitOfWork> Transaction<'a, U> {
    /// Opens a new scope on the unit of work.
    pub async fn begin(uow: &'a mut U) -> Result<Self> {
        uow.begin().await?;
        Ok(Self {
            uow,
            finished: false,
        })
    }

    /// Returns the repository bound to this transaction.
    pub fn products(&mut self) -> &mut U::Products {
        self.uow.products()
    }

    /// Commits the scope.
    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        let result = self.uow.commit().await;
        if result.is_err() {
            self.uow.rollback();
        }
        result
    }

    /// Rolls the scope back explicitly.
    pub fn rollback(mut self) {
        self.finished = true;
        self.uow.rollback();
    }
}

impl<U: UnitOfWork> Drop for Transaction<'_, U> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("rolling back uncommitted unit of work");
            self.uow.rollback();
        }
    }
}
