//! In-memory product store with optimistic version checks.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard};

use chrono::NaiveDate;

use stockline_core::{BatchRef, ExpectedVersion, Sku};
use stockline_domain::{Batch, OrderLine, RepositoryError};
use stockline_messaging::UnitOfWorkError;

/// Stored shape of one batch. Kept separate from the aggregate so the store
/// never hands out live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub reference: BatchRef,
    pub sku: Sku,
    pub purchased_quantity: u32,
    pub eta: Option<NaiveDate>,
    pub allocations: BTreeSet<OrderLine>,
}

impl From<&Batch> for BatchRecord {
    fn from(batch: &Batch) -> Self {
        Self {
            reference: batch.reference().clone(),
            sku: batch.sku().clone(),
            purchased_quantity: batch.purchased_quantity(),
            eta: batch.eta(),
            allocations: batch.allocations().clone(),
        }
    }
}

impl From<&BatchRecord> for Batch {
    fn from(record: &BatchRecord) -> Self {
        Batch::with_allocations(
            record.reference.clone(),
            record.sku.clone(),
            record.purchased_quantity,
            record.eta,
            record.allocations.clone(),
        )
    }
}

/// Stored shape of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub batches: Vec<BatchRecord>,
    pub version: u64,
}

/// One pending write in a commit batch: replace the product's stored state,
/// provided the stored version still matches `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductWrite {
    pub sku: Sku,
    pub batches: Vec<BatchRecord>,
    pub expected: ExpectedVersion,
    pub new_version: u64,
}

/// In-memory product store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<Sku, ProductRecord>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, sku: &Sku) -> Result<Option<ProductRecord>, RepositoryError> {
        let products = self.read_lock()?;
        Ok(products.get(sku).cloned())
    }

    /// Linear scan; batch references are unique per product, and unit-of-work
    /// invariants keep them unique across products that share a sku.
    pub fn find_sku_by_batch_ref(
        &self,
        reference: &BatchRef,
    ) -> Result<Option<Sku>, RepositoryError> {
        let products = self.read_lock()?;
        Ok(products.iter().find_map(|(sku, record)| {
            record
                .batches
                .iter()
                .any(|batch| &batch.reference == reference)
                .then(|| sku.clone())
        }))
    }

    pub fn version_of(&self, sku: &Sku) -> Result<Option<u64>, RepositoryError> {
        let products = self.read_lock()?;
        Ok(products.get(sku).map(|record| record.version))
    }

    /// Apply a batch of writes under one lock: every version check passes or
    /// nothing is applied.
    pub fn commit(&self, writes: Vec<ProductWrite>) -> Result<(), UnitOfWorkError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut products = self
            .products
            .write()
            .map_err(|_| UnitOfWorkError::storage("product store lock poisoned"))?;

        for write in &writes {
            let current = products.get(&write.sku).map(|record| record.version);
            if !write.expected.matches(current) {
                let found = match current {
                    Some(version) => format!("v{version}"),
                    None => "none".to_string(),
                };
                return Err(UnitOfWorkError::concurrency(format!(
                    "product {}: expected {}, found {found}",
                    write.sku, write.expected
                )));
            }
        }

        for write in writes {
            products.insert(
                write.sku,
                ProductRecord {
                    batches: write.batches,
                    version: write.new_version,
                },
            );
        }

        Ok(())
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, HashMap<Sku, ProductRecord>>, RepositoryError> {
        self.products
            .read()
            .map_err(|_| RepositoryError::storage("product store lock poisoned"))
    }
}
