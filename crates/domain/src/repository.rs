//! Repository port for the product aggregate.

use thiserror::Error;

use stockline_core::{BatchRef, Sku};

use crate::product::Product;

/// Storage-side failure while resolving or tracking aggregates.
///
/// Concurrency conflicts are not represented here: they only exist at commit
/// time and belong to the unit of work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Access to products within one unit-of-work scope.
///
/// Implementations keep an identity map of every aggregate handed out, so the
/// owning unit of work can flush state and harvest outboxes across all of
/// them at commit time. Aggregates are rebuilt from stored state on first
/// access; repeated lookups in one scope return the same instance.
pub trait ProductRepository {
    /// Track a new aggregate created in this scope. The write happens at
    /// commit; a product that already exists in the store surfaces as a
    /// commit-time conflict.
    fn add(&mut self, product: Product);

    /// Resolve a product by sku. `Ok(None)` when the store has no record.
    fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>, RepositoryError>;

    /// Resolve the product owning a batch, searching this scope's tracked
    /// aggregates before the store.
    fn get_by_batch_ref(&mut self, reference: &BatchRef)
    -> Result<Option<&mut Product>, RepositoryError>;
}
