//! Outbound integration-event port.

use std::sync::Arc;

use thiserror::Error;

use stockline_domain::Event;

/// Publication failure reported by a publisher adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("event publication failed: {0}")]
pub struct PublishError(pub String);

/// Publishes committed domain events on a named channel for external
/// consumers (broker topic, change feed).
///
/// Best-effort like [`crate::Notifications`]: failures are isolated per
/// handler and never roll back state.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, channel: &str, event: &Event) -> Result<(), PublishError>;
}

impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    fn publish(&self, channel: &str, event: &Event) -> Result<(), PublishError> {
        (**self).publish(channel, event)
    }
}
