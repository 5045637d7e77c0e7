//! Fan-out publisher over a static subscriber list

use crate::delivery::Deliver;
use crate::types::{Event, EventId};

/// Result type for publish operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors from publishing an event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Some subscribers did not receive the event; the rest already did
    #[error("Failed to publish event {event_id} to subscribers {failed:?}")]
    PartialFailure {
        event_id: EventId,
        failed: Vec<String>,
    },
}

impl PublishError {
    /// URLs of the subscribers that failed
    pub fn failed_subscribers(&self) -> &[String] {
        match self {
            PublishError::PartialFailure { failed, .. } => failed,
        }
    }
}

/// Delivers each published event to every subscriber
pub struct Publisher<D> {
    subscribers: Vec<String>,
    deliver: D,
}

impl<D: Deliver> Publisher<D> {
    pub fn new(subscribers: Vec<String>, deliver: D) -> Self {
        Self {
            subscribers,
            deliver,
        }
    }

    pub fn subscribers(&self) -> &[String] {
        &self.subscribers
    }

    /// Deliver `event` to every subscriber in configured order
    ///
    /// A failing subscriber does not stop delivery to the ones after it.
    /// Not atomic: on `PartialFailure` the other subscribers have the event.
    pub async fn publish(&self, event: &Event) -> PublishResult<()> {
        let mut failed = Vec::new();

        for url in &self.subscribers {
            if let Err(e) = self.deliver.deliver(url, event).await {
                tracing::error!(event_id = %event.id(), url = %url, error = %e, "Failed to send event to subscriber");
                failed.push(url.clone());
            }
        }

        if !failed.is_empty() {
            return Err(PublishError::PartialFailure {
                event_id: event.id(),
                failed,
            });
        }

        tracing::info!(event_id = %event.id(), subscribers = self.subscribers.len(), "Published event to all subscribers");
        Ok(())
    }
}
