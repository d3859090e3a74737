//! Outbound notification port.

use std::sync::Arc;

use thiserror::Error;

/// Delivery failure reported by a notification adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Best-effort outbound notifications (mail, chat, pager).
///
/// Called from event handlers after state is committed. A failure here is
/// isolated by the bus and never rolls the commit back.
pub trait Notifications: Send + Sync {
    fn send(&self, address: &str, message: &str) -> Result<(), NotificationError>;
}

impl<T: Notifications + ?Sized> Notifications for Arc<T> {
    fn send(&self, address: &str, message: &str) -> Result<(), NotificationError> {
        (**self).send(address, message)
    }
}
