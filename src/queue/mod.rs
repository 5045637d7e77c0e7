//! Durable retry queue
//!
//! A bounded buffer drained by exactly one background consumer. Every
//! accepted event ends up delivered or dead-lettered.
//!
//! # Item lifecycle
//!
//! ```text
//! enqueue ──► Pending ──► Delivering ──┬──► Delivered
//!                ▲                     │
//!                └── attempts += 1 ◄───┤ (attempts < max)
//!                                      └──► DeadLettered (attempts == max)
//! ```

mod delivery_queue;

pub use delivery_queue::{DeliveryQueue, QueueError, QueueResult};
