//! Data types shared by the queue, bus and event store
//!
//! This module contains the canonical event record and its wire shapes.

mod event;
mod queue_item;

pub use event::{Candidate, Event, EventError, EventId, EventRecord};
pub use queue_item::QueueItem;
