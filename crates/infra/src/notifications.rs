//! Notification adapters.

use std::sync::Mutex;

use tracing::info;

use stockline_messaging::{NotificationError, Notifications};

/// Captures sent notifications as `(address, message)` pairs. The default
/// double for tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingNotifications {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifications for RecordingNotifications {
    fn send(&self, address: &str, message: &str) -> Result<(), NotificationError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| NotificationError("notification log lock poisoned".to_string()))?;
        sent.push((address.to_string(), message.to_string()));
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifications;

impl Notifications for TracingNotifications {
    fn send(&self, address: &str, message: &str) -> Result<(), NotificationError> {
        info!(address, message, "notification");
        Ok(())
    }
}
