//! Message-bus mechanics: dispatch loop, handler registry, unit-of-work
//! contract, and the use-case handlers themselves.
//!
//! The bus is synchronous. One external `dispatch` call settles its whole
//! cascade before returning; independent dispatches may run concurrently
//! from separate threads, arbitrated by the store's version checks.

pub mod bus;
pub mod handlers;
pub mod notifications;
pub mod publisher;
pub mod registry;
pub mod retry;
pub mod unit_of_work;

#[cfg(test)]
mod test_support;

pub use bus::{BusConfig, BusError, CancellationToken, MessageBus};
pub use handlers::HandlerError;
pub use notifications::{NotificationError, Notifications};
pub use publisher::{EventPublisher, PublishError};
pub use registry::HandlerRegistry;
pub use retry::{RetryPolicy, RetryableError};
pub use unit_of_work::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};
