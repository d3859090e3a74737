//! Allocation domain: the `Product` aggregate and its message vocabulary.
//!
//! This crate contains business rules only, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod commands;
pub mod events;
pub mod message;
pub mod product;
pub mod repository;

pub use commands::{
    Allocate, ChangeBatchQuantity, Command, CommandKind, CommandPayload, CreateBatch, Deallocate,
};
pub use events::{Allocated, Deallocated, Event, EventKind, EventPayload, OutOfStock};
pub use message::Message;
pub use product::{Batch, OrderLine, Product};
pub use repository::{ProductRepository, RepositoryError};
