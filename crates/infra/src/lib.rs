//! In-memory infrastructure: the product store, store-backed unit of work,
//! adapters for the outbound ports, and bootstrap wiring for the bus.

pub mod bootstrap;
pub mod notifications;
pub mod product_store;
pub mod publisher;
pub mod unit_of_work;
pub mod views;


pub use bootstrap::message_bus;
pub use notifications::{RecordingNotifications, TracingNotifications};
pub use product_store::{BatchRecord, InMemoryProductStore, ProductRecord, ProductWrite};
pub use publisher::{RecordingPublisher, TracingPublisher};
pub use unit_of_work::{InMemoryProducts, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
pub use views::{AllocationRow, AllocationsView};
