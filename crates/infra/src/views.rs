//! Allocations read model, maintained by event handlers.

use std::collections::HashMap;
use std::sync::RwLock;

use stockline_core::{BatchRef, OrderId, Sku};
use stockline_domain::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRow {
    pub sku: Sku,
    pub batch_ref: BatchRef,
}

/// Current allocations per order, written on `Allocated` and erased on
/// `Deallocated`. Queries never touch the aggregate store.
#[derive(Debug, Default)]
pub struct AllocationsView {
    rows: RwLock<HashMap<OrderId, Vec<AllocationRow>>>,
}

impl AllocationsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per `(order, sku)`; a re-allocation replaces the old batch.
    pub fn record(&self, order_id: OrderId, sku: Sku, batch_ref: BatchRef) -> Result<(), RepositoryError> {
        let mut rows = self.write_lock()?;
        let entries = rows.entry(order_id).or_default();
        entries.retain(|row| row.sku != sku);
        entries.push(AllocationRow { sku, batch_ref });
        Ok(())
    }

    pub fn remove(&self, order_id: &OrderId, sku: &Sku) -> Result<(), RepositoryError> {
        let mut rows = self.write_lock()?;
        if let Some(entries) = rows.get_mut(order_id) {
            entries.retain(|row| &row.sku != sku);
            if entries.is_empty() {
                rows.remove(order_id);
            }
        }
        Ok(())
    }

    pub fn allocations_for(&self, order_id: &OrderId) -> Result<Vec<AllocationRow>, RepositoryError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| RepositoryError::storage("allocations view lock poisoned"))?;
        Ok(rows.get(order_id).cloned().unwrap_or_default())
    }

    fn write_lock(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<OrderId, Vec<AllocationRow>>>, RepositoryError>
    {
        self.rows
            .write()
            .map_err(|_| RepositoryError::storage("allocations view lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_id(value: &str) -> OrderId {
        OrderId::new(value).unwrap()
    }

    fn sku(value: &str) -> Sku {
        Sku::new(value).unwrap()
    }

    fn batch_ref(value: &str) -> BatchRef {
        BatchRef::new(value).unwrap()
    }

    #[test]
    fn records_and_lists_allocations_per_order() {
        let view = AllocationsView::new();

        view.record(order_id("order-1"), sku("LAMP"), batch_ref("warehouse")).unwrap();
        view.record(order_id("order-1"), sku("CHAIR"), batch_ref("chairs")).unwrap();
        view.record(order_id("order-2"), sku("LAMP"), batch_ref("warehouse")).unwrap();

        let rows = view.allocations_for(&order_id("order-1")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(view.allocations_for(&order_id("order-2")).unwrap().len(), 1);
        assert!(view.allocations_for(&order_id("order-3")).unwrap().is_empty());
    }

    #[test]
    fn reallocation_replaces_the_row() {
        let view = AllocationsView::new();
        view.record(order_id("order-1"), sku("LAMP"), batch_ref("day1")).unwrap();

        view.record(order_id("order-1"), sku("LAMP"), batch_ref("day2")).unwrap();

        let rows = view.allocations_for(&order_id("order-1")).unwrap();
        assert_eq!(rows, vec![AllocationRow { sku: sku("LAMP"), batch_ref: batch_ref("day2") }]);
    }

    #[test]
    fn remove_erases_only_the_matching_sku() {
        let view = AllocationsView::new();
        view.record(order_id("order-1"), sku("LAMP"), batch_ref("warehouse")).unwrap();
        view.record(order_id("order-1"), sku("CHAIR"), batch_ref("chairs")).unwrap();

        view.remove(&order_id("order-1"), &sku("LAMP")).unwrap();

        let rows = view.allocations_for(&order_id("order-1")).unwrap();
        assert_eq!(rows, vec![AllocationRow { sku: sku("CHAIR"), batch_ref: batch_ref("chairs") }]);

        view.remove(&order_id("order-1"), &sku("CHAIR")).unwrap();
        assert!(view.allocations_for(&order_id("order-1")).unwrap().is_empty());
    }
}
