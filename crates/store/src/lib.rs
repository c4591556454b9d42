//! Persistence boundary for the allocation service.
//!
//! - [`Repository`] loads and tracks [`Product`](domain::Product) aggregates
//! - [`UnitOfWork`] wraps a repository in a transaction and harvests events
//! - [`Transaction`] guard guaranteeing commit or rollback on every exit path
//! - In-memory implementations used by tests and the HTTP entrypoint

pub mod error;
pub mod memory;
pub mod repository;
pub mod unit_of_work;

pub use error::{Result, StoreError};
pub use memory::{InMemoryProductStore, InMemoryRepository, InMemoryUnitOfWork};
pub use repository::Repository;
pub use unit_of_work::{Transaction, UnitOfWork, UnitOfWorkFactory};
