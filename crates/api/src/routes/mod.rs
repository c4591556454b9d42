pub mod allocations;
pub mod batches;
pub mod health;
pub mod metrics;
pub mod products;
