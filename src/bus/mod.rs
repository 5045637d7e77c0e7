//! Publish/subscribe bus
//!
//! Fans one event out to a fixed list of subscriber webhooks. Delivery is
//! sequential and in list order on the caller's task, so a slow subscriber
//! delays every subscriber after it. There is no retry and no rollback.

mod publisher;

pub use publisher::{PublishError, PublishResult, Publisher};
