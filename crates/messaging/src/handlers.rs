//! Use-case handlers: the orchestration layer between messages and aggregates.
//!
//! Each handler runs inside one unit-of-work scope supplied by the bus: load
//! or create the aggregate, invoke its behavior, commit. Handlers never hold
//! aggregates across scopes, so a retried invocation always re-reads state.

use thiserror::Error;
use tracing::debug;

use stockline_core::{BatchRef, DomainError, Sku};
use stockline_domain::{
    Allocate, Allocated, Batch, ChangeBatchQuantity, CreateBatch, Deallocate, Deallocated, Event,
    OrderLine, OutOfStock, Product, ProductRepository, RepositoryError,
};

use crate::notifications::{NotificationError, Notifications};
use crate::publisher::{EventPublisher, PublishError};
use crate::retry::RetryableError;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkError};

/// Address out-of-stock alerts are sent to.
pub const STOCK_ALERTS_ADDRESS: &str = "stock-alerts@warehouse.example";

/// Channel allocation facts are published on.
pub const LINE_ALLOCATED_CHANNEL: &str = "line_allocated";

/// Failure of one handler invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("unknown sku {0}")]
    UnknownSku(Sku),

    #[error("unknown batch reference {0}")]
    UnknownBatch(BatchRef),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    UnitOfWork(#[from] UnitOfWorkError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// A registry adapter received a message of the wrong variant. Only
    /// reachable through a registration bug, never through user input.
    #[error("misrouted message reached handler {0}")]
    Misrouted(&'static str),
}

impl HandlerError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::UnitOfWork(UnitOfWorkError::Concurrency(_)))
    }
}

impl RetryableError for HandlerError {
    fn is_retryable(&self) -> bool {
        self.is_concurrency_conflict()
    }
}

/// Register a purchased batch, creating the product on first sight of a sku.
pub fn add_batch<U: UnitOfWork>(
    cmd: CreateBatch,
    uow: &mut U,
) -> Result<Option<BatchRef>, HandlerError> {
    let batch = Batch::new(cmd.reference, cmd.sku.clone(), cmd.quantity, cmd.eta);
    let products = uow.products();
    if products.get(&cmd.sku)?.is_none() {
        products.add(Product::new(cmd.sku.clone()));
    }
    let product = products
        .get(&cmd.sku)?
        .ok_or_else(|| HandlerError::UnknownSku(cmd.sku.clone()))?;
    product.add_batch(batch)?;
    uow.commit()?;
    Ok(None)
}

/// Allocate an order line, returning the chosen batch reference. `None` means
/// out of stock: the aggregate records the event and the notification handler
/// takes it from there.
pub fn allocate<U: UnitOfWork>(
    cmd: Allocate,
    uow: &mut U,
) -> Result<Option<BatchRef>, HandlerError> {
    let line = OrderLine::new(cmd.order_id, cmd.sku, cmd.qty)?;
    let product = uow
        .products()
        .get(line.sku())?
        .ok_or_else(|| HandlerError::UnknownSku(line.sku().clone()))?;
    let chosen = product.allocate(line)?;
    uow.commit()?;
    Ok(chosen)
}

/// Release a previously allocated order line.
pub fn deallocate<U: UnitOfWork>(
    cmd: Deallocate,
    uow: &mut U,
) -> Result<Option<BatchRef>, HandlerError> {
    let line = OrderLine::new(cmd.order_id, cmd.sku, cmd.qty)?;
    let product = uow
        .products()
        .get(line.sku())?
        .ok_or_else(|| HandlerError::UnknownSku(line.sku().clone()))?;
    product.deallocate(&line)?;
    uow.commit()?;
    Ok(None)
}

/// Reset a batch's purchased quantity. Lines that no longer fit surface as
/// `Deallocated` events and come back through [`reallocate`].
pub fn change_batch_quantity<U: UnitOfWork>(
    cmd: ChangeBatchQuantity,
    uow: &mut U,
) -> Result<Option<BatchRef>, HandlerError> {
    let product = uow
        .products()
        .get_by_batch_ref(&cmd.reference)?
        .ok_or_else(|| HandlerError::UnknownBatch(cmd.reference.clone()))?;
    product.change_batch_quantity(&cmd.reference, cmd.new_quantity)?;
    uow.commit()?;
    Ok(None)
}

/// Event handler: a force-released line goes back through allocation, landing
/// on another batch or legitimately going out of stock.
pub fn reallocate<U: UnitOfWork>(event: Deallocated, uow: &mut U) -> Result<(), HandlerError> {
    let cmd = Allocate {
        order_id: event.order_id,
        sku: event.sku,
        qty: event.qty,
    };
    debug!(order_id = %cmd.order_id, sku = %cmd.sku, "reallocating released line");
    allocate(cmd, uow).map(|_| ())
}

/// Event handler: best-effort alert when a sku runs dry.
pub fn send_out_of_stock_notification(
    event: OutOfStock,
    notifications: &dyn Notifications,
) -> Result<(), HandlerError> {
    notifications.send(STOCK_ALERTS_ADDRESS, &format!("out of stock: {}", event.sku))?;
    Ok(())
}

/// Event handler: surface the committed allocation to external consumers.
pub fn publish_allocated_event(
    event: Allocated,
    publisher: &dyn EventPublisher,
) -> Result<(), HandlerError> {
    publisher.publish(LINE_ALLOCATED_CHANNEL, &Event::Allocated(event))?;
    Ok(())
}
