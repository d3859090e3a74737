//! Assembles a ready-to-dispatch bus: the default handler table wired to a
//! store, a notification channel, a publisher, and the allocations view.

use std::sync::Arc;

use stockline_domain::{Allocated, Deallocated, OutOfStock};
use stockline_messaging::{
    BusConfig, EventPublisher, HandlerRegistry, MessageBus, Notifications, handlers,
};

use crate::product_store::InMemoryProductStore;
use crate::unit_of_work::{InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
use crate::views::AllocationsView;

/// The default handler table:
///
/// | message                | handlers                                      |
/// |------------------------|-----------------------------------------------|
/// | `CreateBatch`          | `add_batch`                                   |
/// | `Allocate`             | `allocate`                                    |
/// | `Deallocate`           | `deallocate`                                  |
/// | `ChangeBatchQuantity`  | `change_batch_quantity`                       |
/// | `Allocated`            | `publish_allocated_event`, `add_allocation_to_view` |
/// | `Deallocated`          | `remove_allocation_from_view`, `reallocate`   |
/// | `OutOfStock`           | `send_out_of_stock_notification`              |
///
/// Event handlers run in table order, so a force-released line leaves the
/// view before reallocation adds it back.
pub fn message_bus(
    store: Arc<InMemoryProductStore>,
    notifications: Arc<dyn Notifications>,
    publisher: Arc<dyn EventPublisher>,
    view: Arc<AllocationsView>,
    config: BusConfig,
) -> MessageBus<InMemoryUnitOfWorkFactory> {
    let mut registry: HandlerRegistry<InMemoryUnitOfWork> = HandlerRegistry::new();

    registry.register_command("add_batch", handlers::add_batch);
    registry.register_command("allocate", handlers::allocate);
    registry.register_command("deallocate", handlers::deallocate);
    registry.register_command("change_batch_quantity", handlers::change_batch_quantity);

    let publish_to = Arc::clone(&publisher);
    registry.register_event(
        "publish_allocated_event",
        move |event: Allocated, _uow: &mut InMemoryUnitOfWork| {
            handlers::publish_allocated_event(event, publish_to.as_ref())
        },
    );
    let view_add = Arc::clone(&view);
    registry.register_event(
        "add_allocation_to_view",
        move |event: Allocated, _uow: &mut InMemoryUnitOfWork| {
            view_add.record(event.order_id, event.sku, event.batch_ref)?;
            Ok(())
        },
    );

    let view_remove = Arc::clone(&view);
    registry.register_event(
        "remove_allocation_from_view",
        move |event: Deallocated, _uow: &mut InMemoryUnitOfWork| {
            view_remove.remove(&event.order_id, &event.sku)?;
            Ok(())
        },
    );
    registry.register_event("reallocate", handlers::reallocate);

    registry.register_event(
        "send_out_of_stock_notification",
        move |event: OutOfStock, _uow: &mut InMemoryUnitOfWork| {
            handlers::send_out_of_stock_notification(event, notifications.as_ref())
        },
    );

    MessageBus::new(registry, InMemoryUnitOfWorkFactory::new(store), config)
}
