//! Delivery bookkeeping for queued events

use serde::Serialize;

use super::Event;

/// An event in flight through the delivery queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub event: Event,
    /// Failed delivery attempts so far
    pub attempts: u32,
}

impl QueueItem {
    pub fn new(event: Event) -> Self {
        Self { event, attempts: 0 }
    }
}
