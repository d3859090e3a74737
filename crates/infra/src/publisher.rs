//! Event-publisher adapters.

use std::sync::Mutex;

use tracing::info;

use stockline_domain::Event;
use stockline_messaging::{EventPublisher, PublishError};

/// Captures published events as `(channel, json)` pairs.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, channel: &str, event: &Event) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event).map_err(|err| PublishError(err.to_string()))?;
        let mut published = self
            .published
            .lock()
            .map_err(|_| PublishError("publisher log lock poisoned".to_string()))?;
        published.push((channel.to_string(), payload));
        Ok(())
    }
}

/// Writes publications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, channel: &str, event: &Event) -> Result<(), PublishError> {
        info!(channel, event = event.name(), "published event");
        Ok(())
    }
}
