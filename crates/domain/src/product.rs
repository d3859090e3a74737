//! Product aggregate: batches of purchased stock and the allocation policy.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use stockline_core::{
    AggregateRoot, BatchRef, DomainError, DomainResult, Entity, OrderId, Sku, ValueObject,
};

use crate::events::{Allocated, Deallocated, Event, OutOfStock};

/// Customer demand for a quantity of one sku.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderLine {
    order_id: OrderId,
    sku: Sku,
    qty: u32,
}

impl OrderLine {
    pub fn new(order_id: OrderId, sku: Sku, qty: u32) -> DomainResult<Self> {
        if qty == 0 {
            return Err(DomainError::validation("order line quantity must be positive"));
        }
        Ok(Self { order_id, sku, qty })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn qty(&self) -> u32 {
        self.qty
    }
}

impl ValueObject for OrderLine {}

/// One purchased batch of stock: in the warehouse when `eta` is `None`,
/// otherwise arriving on that date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    reference: BatchRef,
    sku: Sku,
    purchased_quantity: u32,
    eta: Option<NaiveDate>,
    allocations: BTreeSet<OrderLine>,
}

impl Batch {
    pub fn new(reference: BatchRef, sku: Sku, purchased_quantity: u32, eta: Option<NaiveDate>) -> Self {
        Self {
            reference,
            sku,
            purchased_quantity,
            eta,
            allocations: BTreeSet::new(),
        }
    }

    /// Rebuild a batch from stored state, allocations included. Used by
    /// repositories when mapping records back into the aggregate.
    pub fn with_allocations(
        reference: BatchRef,
        sku: Sku,
        purchased_quantity: u32,
        eta: Option<NaiveDate>,
        allocations: BTreeSet<OrderLine>,
    ) -> Self {
        Self {
            reference,
            sku,
            purchased_quantity,
            eta,
            allocations,
        }
    }

    pub fn reference(&self) -> &BatchRef {
        &self.reference
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    pub fn allocations(&self) -> &BTreeSet<OrderLine> {
        &self.allocations
    }

    pub fn allocated_quantity(&self) -> u32 {
        self.allocations.iter().map(OrderLine::qty).sum()
    }

    /// Signed so that a shrunk batch can report over-commitment.
    pub fn available_quantity(&self) -> i64 {
        i64::from(self.purchased_quantity) - i64::from(self.allocated_quantity())
    }

    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == *line.sku() && self.available_quantity() >= i64::from(line.qty())
    }

    fn holds(&self, line: &OrderLine) -> bool {
        self.allocations.contains(line)
    }

    fn allocate(&mut self, line: OrderLine) {
        self.allocations.insert(line);
    }

    fn deallocate(&mut self, line: &OrderLine) -> bool {
        self.allocations.remove(line)
    }

    /// Pops the first line in `(order_id, sku, qty)` order, keeping forced
    /// deallocation deterministic.
    fn deallocate_one(&mut self) -> Option<OrderLine> {
        self.allocations.pop_first()
    }

    fn set_purchased_quantity(&mut self, quantity: u32) {
        self.purchased_quantity = quantity;
    }
}

impl Entity for Batch {
    type Id = BatchRef;

    fn id(&self) -> &Self::Id {
        &self.reference
    }
}

/// Aggregate root: all batches for one sku, plus the outbox of events the
/// current unit-of-work scope has not yet harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    sku: Sku,
    batches: Vec<Batch>,
    version: u64,
    events: Vec<Event>,
}

impl Product {
    pub fn new(sku: Sku) -> Self {
        Self {
            sku,
            batches: Vec::new(),
            version: 0,
            events: Vec::new(),
        }
    }

    /// Rebuild from stored state. The outbox starts empty: events belong to
    /// the scope that produced them, never to the store.
    pub fn from_parts(sku: Sku, batches: Vec<Batch>, version: u64) -> Self {
        Self {
            sku,
            batches,
            version,
            events: Vec::new(),
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch(&self, reference: &BatchRef) -> Option<&Batch> {
        self.batches.iter().find(|batch| batch.reference() == reference)
    }

    /// Events accumulated since load, in emission order.
    pub fn pending_events(&self) -> &[Event] {
        &self.events
    }

    /// Read-and-clear the outbox. Called by the unit of work at commit time.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn add_batch(&mut self, batch: Batch) -> DomainResult<()> {
        if batch.sku() != &self.sku {
            return Err(DomainError::invariant(format!(
                "batch {} carries sku {}, product is {}",
                batch.reference(),
                batch.sku(),
                self.sku
            )));
        }
        if self.batches.iter().any(|existing| existing.reference() == batch.reference()) {
            return Err(DomainError::conflict(format!(
                "batch {} already registered for {}",
                batch.reference(),
                self.sku
            )));
        }
        self.batches.push(batch);
        self.version += 1;
        Ok(())
    }

    /// Allocate an order line against the best candidate batch.
    ///
    /// In-stock batches beat future-dated ones, the earliest eta wins within
    /// the future-dated group, and the shipment reference breaks remaining
    /// ties, so candidate choice is a total order. When nothing fits, an
    /// `OutOfStock` event is recorded and no state changes.
    pub fn allocate(&mut self, line: OrderLine) -> DomainResult<Option<BatchRef>> {
        self.ensure_sku(&line)?;

        let Some(index) = self.best_batch_for(&line) else {
            self.events.push(Event::OutOfStock(OutOfStock { sku: self.sku.clone() }));
            return Ok(None);
        };

        let reference = self.batches[index].reference().clone();
        let event = Allocated {
            order_id: line.order_id().clone(),
            sku: line.sku().clone(),
            qty: line.qty(),
            batch_ref: reference.clone(),
        };
        self.batches[index].allocate(line);
        self.version += 1;
        self.events.push(Event::Allocated(event));
        Ok(Some(reference))
    }

    /// Release an order line from whichever batch holds it.
    pub fn deallocate(&mut self, line: &OrderLine) -> DomainResult<()> {
        self.ensure_sku(line)?;

        let Some(batch) = self.batches.iter_mut().find(|batch| batch.holds(line)) else {
            return Err(DomainError::not_found(format!(
                "order line {} holds no allocation on {}",
                line.order_id(),
                self.sku
            )));
        };
        batch.deallocate(line);
        self.version += 1;
        self.events.push(Event::Deallocated(Deallocated {
            order_id: line.order_id().clone(),
            sku: line.sku().clone(),
            qty: line.qty(),
        }));
        Ok(())
    }

    /// Reset a batch's purchased quantity. While the batch is over-committed,
    /// lines are force-released one at a time, each recorded as a
    /// `Deallocated` event so downstream handlers can re-allocate them.
    pub fn change_batch_quantity(&mut self, reference: &BatchRef, new_quantity: u32) -> DomainResult<()> {
        let Some(index) = self.batches.iter().position(|batch| batch.reference() == reference) else {
            return Err(DomainError::not_found(format!(
                "no batch {} on product {}",
                reference, self.sku
            )));
        };

        self.batches[index].set_purchased_quantity(new_quantity);
        self.version += 1;

        while self.batches[index].available_quantity() < 0 {
            let Some(line) = self.batches[index].deallocate_one() else {
                break;
            };
            let OrderLine { order_id, sku, qty } = line;
            self.events.push(Event::Deallocated(Deallocated { order_id, sku, qty }));
        }
        Ok(())
    }

    fn ensure_sku(&self, line: &OrderLine) -> DomainResult<()> {
        if line.sku() != &self.sku {
            return Err(DomainError::validation(format!(
                "cannot allocate sku {} against product {}",
                line.sku(),
                self.sku
            )));
        }
        Ok(())
    }

    fn best_batch_for(&self, line: &OrderLine) -> Option<usize> {
        self.batches
            .iter()
            .enumerate()
            .filter(|(_, batch)| batch.can_allocate(line))
            .min_by(|(_, a), (_, b)| {
                a.eta().cmp(&b.eta()).then_with(|| a.reference().cmp(b.reference()))
            })
            .map(|(index, _)| index)
    }
}

impl AggregateRoot for Product {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }

    fn version(&self) -> u64 {
        self.version
    }
}
