//! Error event fan-out.

use optica_common::classify::{classify, ErrorEvent, Severity};
use optica_common::error::OpticaError;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Broadcasts classified errors to every subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ErrorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of subscribers reached.
    pub fn publish(&self, event: ErrorEvent) -> usize {
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    /// Classify, log, and publish an error.
    pub fn report(&self, error: &OpticaError) -> ErrorEvent {
        let event = classify(error);
        match event.severity {
            Severity::Warning => tracing::warn!(
                kind = ?event.kind,
                category = ?event.category,
                error = %error,
                "{}",
                event.message
            ),
            Severity::Error | Severity::Fatal => tracing::error!(
                kind = ?event.kind,
                category = ?event.category,
                severity = ?event.severity,
                error = %error,
                "{}",
                event.message
            ),
        }
        self.publish(event.clone());
        event
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
