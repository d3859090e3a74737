//! Scripted doubles shared by the in-crate tests. The real store lives in the
//! infra crate; these stubs only give the bus something to drive.

use stockline_core::{BatchRef, OrderId, Sku};
use stockline_domain::{
    Allocated, Deallocated, Event, OutOfStock, Product, ProductRepository, RepositoryError,
};

use crate::unit_of_work::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};

/// Repository stub that resolves nothing.
#[derive(Debug, Default)]
pub(crate) struct StubProducts;

impl ProductRepository for StubProducts {
    fn add(&mut self, _product: Product) {}

    fn get(&mut self, _sku: &Sku) -> Result<Option<&mut Product>, RepositoryError> {
        Ok(None)
    }

    fn get_by_batch_ref(
        &mut self,
        _reference: &BatchRef,
    ) -> Result<Option<&mut Product>, RepositoryError> {
        Ok(None)
    }
}

/// Unit of work whose "commits" are whatever the test handler stages. The bus
/// drains staged events exactly the way it drains real harvested ones.
#[derive(Debug, Default)]
pub(crate) struct ScriptedUow {
    products: StubProducts,
    staged: Vec<Event>,
}

impl ScriptedUow {
    pub(crate) fn stage(&mut self, event: Event) {
        self.staged.push(event);
    }
}

impl UnitOfWork for ScriptedUow {
    type Products = StubProducts;

    fn products(&mut self) -> &mut StubProducts {
        &mut self.products
    }

    fn commit(&mut self) -> Result<Vec<Event>, UnitOfWorkError> {
        Ok(Vec::new())
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }

    fn take_new_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.staged)
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedUowFactory;

impl UnitOfWorkFactory for ScriptedUowFactory {
    type Uow = ScriptedUow;

    fn begin(&self) -> ScriptedUow {
        ScriptedUow::default()
    }
}

pub(crate) fn sku(value: &str) -> Sku {
    Sku::new(value).unwrap()
}

pub(crate) fn order_id(value: &str) -> OrderId {
    OrderId::new(value).unwrap()
}

pub(crate) fn allocated(order: &str) -> Event {
    Event::Allocated(Allocated {
        order_id: order_id(order),
        sku: sku("LAMP"),
        qty: 1,
        batch_ref: BatchRef::new("warehouse").unwrap(),
    })
}

pub(crate) fn deallocated(order: &str) -> Event {
    Event::Deallocated(Deallocated {
        order_id: order_id(order),
        sku: sku("LAMP"),
        qty: 1,
    })
}

pub(crate) fn out_of_stock(sku_value: &str) -> Event {
    Event::OutOfStock(OutOfStock { sku: sku(sku_value) })
}
