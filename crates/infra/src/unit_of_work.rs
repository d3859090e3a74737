//! Store-backed unit of work: identity-mapped repository, write-on-commit.

use std::sync::Arc;

use stockline_core::{AggregateRoot, BatchRef, ExpectedVersion, Sku};
use stockline_domain::{Batch, Event, Product, ProductRepository, RepositoryError};
use stockline_messaging::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};

use crate::product_store::{BatchRecord, InMemoryProductStore, ProductWrite};

/// One aggregate tracked by a scope, paired with the version expectation its
/// commit must satisfy.
#[derive(Debug)]
struct TrackedProduct {
    expected: ExpectedVersion,
    product: Product,
}

impl TrackedProduct {
    fn is_dirty(&self) -> bool {
        match self.expected {
            ExpectedVersion::New => true,
            ExpectedVersion::Exact(version) => version != self.product.version(),
        }
    }
}

/// Identity-mapped repository over the in-memory store.
///
/// Aggregates load once per scope and stay tracked in first-seen order, so
/// commits flush and harvest deterministically.
#[derive(Debug)]
pub struct InMemoryProducts {
    store: Arc<InMemoryProductStore>,
    seen: Vec<TrackedProduct>,
}

impl InMemoryProducts {
    fn position_by_sku(&self, sku: &Sku) -> Option<usize> {
        self.seen.iter().position(|tracked| tracked.product.sku() == sku)
    }

    fn position_by_batch_ref(&self, reference: &BatchRef) -> Option<usize> {
        self.seen
            .iter()
            .position(|tracked| tracked.product.batch(reference).is_some())
    }
}

impl ProductRepository for InMemoryProducts {
    fn add(&mut self, product: Product) {
        self.seen.push(TrackedProduct {
            expected: ExpectedVersion::New,
            product,
        });
    }

    fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>, RepositoryError> {
        if let Some(position) = self.position_by_sku(sku) {
            return Ok(Some(&mut self.seen[position].product));
        }

        let Some(record) = self.store.load(sku)? else {
            return Ok(None);
        };
        let batches = record.batches.iter().map(Batch::from).collect();
        self.seen.push(TrackedProduct {
            expected: ExpectedVersion::Exact(record.version),
            product: Product::from_parts(sku.clone(), batches, record.version),
        });
        Ok(self.seen.last_mut().map(|tracked| &mut tracked.product))
    }

    fn get_by_batch_ref(
        &mut self,
        reference: &BatchRef,
    ) -> Result<Option<&mut Product>, RepositoryError> {
        if let Some(position) = self.position_by_batch_ref(reference) {
            return Ok(Some(&mut self.seen[position].product));
        }

        let Some(sku) = self.store.find_sku_by_batch_ref(reference)? else {
            return Ok(None);
        };
        self.get(&sku)
    }
}

/// Unit of work over [`InMemoryProductStore`].
///
/// Nothing is written until `commit`; a scope dropped mid-handler therefore
/// rolls back by doing nothing at all.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    products: InMemoryProducts,
    new_events: Vec<Event>,
}

impl UnitOfWork for InMemoryUnitOfWork {
    type Products = InMemoryProducts;

    fn products(&mut self) -> &mut InMemoryProducts {
        &mut self.products
    }

    fn commit(&mut self) -> Result<Vec<Event>, UnitOfWorkError> {
        // Flush dirty aggregates as one all-or-nothing batch.
        let mut writes = Vec::new();
        for tracked in &self.products.seen {
            if tracked.is_dirty() {
                writes.push(ProductWrite {
                    sku: tracked.product.sku().clone(),
                    batches: tracked.product.batches().iter().map(BatchRecord::from).collect(),
                    expected: tracked.expected,
                    new_version: tracked.product.version(),
                });
            }
        }
        if !writes.is_empty() {
            self.products.store.commit(writes)?;
        }

        // Harvest outboxes in first-seen order, then rebaseline so a later
        // commit in the same scope starts from the stored versions.
        let mut harvested = Vec::new();
        for tracked in &mut self.products.seen {
            harvested.extend(tracked.product.drain_events());
            tracked.expected = ExpectedVersion::Exact(tracked.product.version());
        }
        self.new_events.extend(harvested.iter().cloned());
        Ok(harvested)
    }

    fn rollback(&mut self) {
        self.products.seen.clear();
    }

    fn take_new_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.new_events)
    }
}

/// Opens scopes over a shared store.
#[derive(Debug, Clone)]
pub struct InMemoryUnitOfWorkFactory {
    store: Arc<InMemoryProductStore>,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: Arc<InMemoryProductStore>) -> Self {
        Self { store }
    }
}

impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    type Uow = InMemoryUnitOfWork;

    fn begin(&self) -> InMemoryUnitOfWork {
        InMemoryUnitOfWork {
            products: InMemoryProducts {
                store: Arc::clone(&self.store),
                seen: Vec::new(),
            },
            new_events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use stockline_core::OrderId;
    use stockline_domain::OrderLine;

    use super::*;

    fn sku(value: &str) -> Sku {
        Sku::new(value).unwrap()
    }

    fn batch_ref(value: &str) -> BatchRef {
        BatchRef::new(value).unwrap()
    }

    fn line(order: &str, sku_value: &str, qty: u32) -> OrderLine {
        OrderLine::new(OrderId::new(order).unwrap(), sku(sku_value), qty).unwrap()
    }

    fn factory() -> (Arc<InMemoryProductStore>, InMemoryUnitOfWorkFactory) {
        let store = Arc::new(InMemoryProductStore::new());
        let factory = InMemoryUnitOfWorkFactory::new(Arc::clone(&store));
        (store, factory)
    }

    fn seed_product(factory: &InMemoryUnitOfWorkFactory, sku_value: &str, reference: &str, qty: u32) {
        let mut uow = factory.begin();
        let mut product = Product::new(sku(sku_value));
        product
            .add_batch(Batch::new(batch_ref(reference), sku(sku_value), qty, None))
            .unwrap();
        uow.products().add(product);
        uow.commit().unwrap();
    }

    #[test]
    fn commit_writes_new_products_and_harvests_events() {
        let (store, factory) = factory();
        let mut uow = factory.begin();

        let mut product = Product::new(sku("LAMP"));
        product
            .add_batch(Batch::new(batch_ref("warehouse"), sku("LAMP"), 20, None))
            .unwrap();
        uow.products().add(product);
        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-1", "LAMP", 3)).unwrap();

        let harvested = uow.commit().unwrap();

        assert_eq!(harvested.len(), 1);
        assert!(matches!(harvested[0], Event::Allocated(_)));
        assert_eq!(store.version_of(&sku("LAMP")).unwrap(), Some(2));
        assert_eq!(uow.take_new_events(), harvested);
    }

    #[test]
    fn commit_harvests_every_seen_aggregate() {
        let (_, factory) = factory();
        seed_product(&factory, "LAMP", "lamp-batch", 20);
        seed_product(&factory, "CHAIR", "chair-batch", 20);

        let mut uow = factory.begin();
        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-1", "LAMP", 1)).unwrap();
        let product = uow.products().get(&sku("CHAIR")).unwrap().unwrap();
        product.allocate(line("order-1", "CHAIR", 1)).unwrap();

        let harvested = uow.commit().unwrap();

        // One event per aggregate, in first-seen order, outboxes now empty.
        assert_eq!(harvested.len(), 2);
        assert!(matches!(&harvested[0], Event::Allocated(a) if a.sku == sku("LAMP")));
        assert!(matches!(&harvested[1], Event::Allocated(a) if a.sku == sku("CHAIR")));
        for item in ["LAMP", "CHAIR"] {
            let product = uow.products().get(&sku(item)).unwrap().unwrap();
            assert!(product.pending_events().is_empty());
        }
    }

    #[test]
    fn uncommitted_scopes_write_nothing() {
        let (store, factory) = factory();

        {
            let mut uow = factory.begin();
            uow.products().add(Product::new(sku("LAMP")));
        }

        assert_eq!(store.load(&sku("LAMP")).unwrap(), None);
    }

    #[test]
    fn rollback_forgets_tracked_aggregates() {
        let (store, factory) = factory();
        let mut uow = factory.begin();
        uow.products().add(Product::new(sku("LAMP")));

        uow.rollback();
        let harvested = uow.commit().unwrap();

        assert!(harvested.is_empty());
        assert_eq!(store.load(&sku("LAMP")).unwrap(), None);
    }

    #[test]
    fn stale_scope_conflicts_at_commit() {
        let (_, factory) = factory();
        seed_product(&factory, "LAMP", "warehouse", 20);

        let mut first = factory.begin();
        first.products().get(&sku("LAMP")).unwrap().unwrap();

        let mut second = factory.begin();
        let product = second.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-1", "LAMP", 1)).unwrap();
        second.commit().unwrap();

        let product = first.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-2", "LAMP", 1)).unwrap();
        let err = first.commit().unwrap_err();

        assert!(matches!(err, UnitOfWorkError::Concurrency(_)));
    }

    #[test]
    fn commit_is_atomic_across_products() {
        let (store, factory) = factory();
        seed_product(&factory, "LAMP", "lamp-batch", 20);
        seed_product(&factory, "CHAIR", "chair-batch", 20);

        // This scope sees both products before a rival commit lands.
        let mut stale = factory.begin();
        stale.products().get(&sku("LAMP")).unwrap().unwrap();
        stale.products().get(&sku("CHAIR")).unwrap().unwrap();

        let mut rival = factory.begin();
        let product = rival.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-1", "LAMP", 1)).unwrap();
        rival.commit().unwrap();

        let product = stale.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-2", "LAMP", 1)).unwrap();
        let product = stale.products().get(&sku("CHAIR")).unwrap().unwrap();
        product.allocate(line("order-2", "CHAIR", 1)).unwrap();

        let err = stale.commit().unwrap_err();

        assert!(matches!(err, UnitOfWorkError::Concurrency(_)));
        // The chair write must not land when the lamp write is rejected.
        assert_eq!(store.version_of(&sku("CHAIR")).unwrap(), Some(1));
        assert_eq!(store.version_of(&sku("LAMP")).unwrap(), Some(2));
    }

    #[test]
    fn repeated_get_returns_the_tracked_instance() {
        let (_, factory) = factory();
        seed_product(&factory, "LAMP", "warehouse", 20);

        let mut uow = factory.begin();
        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-1", "LAMP", 5)).unwrap();

        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();

        assert_eq!(product.batch(&batch_ref("warehouse")).unwrap().available_quantity(), 15);
        assert_eq!(product.pending_events().len(), 1);
    }

    #[test]
    fn get_by_batch_ref_prefers_tracked_state() {
        let (_, factory) = factory();

        let mut uow = factory.begin();
        let mut product = Product::new(sku("LAMP"));
        product
            .add_batch(Batch::new(batch_ref("fresh"), sku("LAMP"), 5, None))
            .unwrap();
        uow.products().add(product);

        // Not committed yet, so only the identity map can resolve this ref.
        let found = uow.products().get_by_batch_ref(&batch_ref("fresh")).unwrap();

        assert!(found.is_some());
    }

    #[test]
    fn get_by_batch_ref_falls_back_to_the_store() {
        let (_, factory) = factory();
        seed_product(&factory, "LAMP", "warehouse", 20);

        let mut uow = factory.begin();
        let product = uow.products().get_by_batch_ref(&batch_ref("warehouse")).unwrap().unwrap();

        assert_eq!(product.sku(), &sku("LAMP"));
        assert!(uow.products().get_by_batch_ref(&batch_ref("ghost")).unwrap().is_none());
    }

    #[test]
    fn second_commit_only_flushes_new_changes() {
        let (store, factory) = factory();
        seed_product(&factory, "LAMP", "warehouse", 20);

        let mut uow = factory.begin();
        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-1", "LAMP", 1)).unwrap();
        let first = uow.commit().unwrap();

        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();
        product.allocate(line("order-2", "LAMP", 1)).unwrap();
        let second = uow.commit().unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first, second);
        assert_eq!(store.version_of(&sku("LAMP")).unwrap(), Some(3));
        // The scope accumulated both commits' events for the bus.
        assert_eq!(uow.take_new_events().len(), 2);
    }

    #[test]
    fn out_of_stock_harvests_the_event_without_writing() {
        let (store, factory) = factory();
        seed_product(&factory, "LAMP", "warehouse", 2);

        let mut uow = factory.begin();
        let product = uow.products().get(&sku("LAMP")).unwrap().unwrap();
        let chosen = product.allocate(line("order-1", "LAMP", 10)).unwrap();
        let harvested = uow.commit().unwrap();

        assert_eq!(chosen, None);
        assert!(matches!(harvested[0], Event::OutOfStock(_)));
        assert_eq!(store.version_of(&sku("LAMP")).unwrap(), Some(1));
    }
}
