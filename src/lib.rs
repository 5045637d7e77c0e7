//! CloudEvents Hub
//!
//! A small event platform built around one CloudEvents-style event schema,
//! shared by three subsystems.
//!
//! # Features
//!
//! - **Retry Queue**: bounded buffer, single consumer, bounded retries, dead-lettering
//! - **Pub/Sub Bus**: sequential fan-out to a static subscriber list with partial-failure reporting
//! - **Event Store**: primary map + `type`/`subject` indices, JSON snapshot persistence
//! - **Thread-Safe**: store guarded by a single-writer/multi-reader lock
//!
//! # Modules
//!
//! - `types`: Core data structures (Event, Candidate, QueueItem)
//! - `validation`: Event field rules
//! - `delivery`: The injected delivery function and the webhook transport
//! - `queue`: Durable retry queue
//! - `bus`: Fan-out publisher
//! - `event_store`: Indexed event store and snapshots
//! - `config`: Environment configuration per service role
//! - `api`: HTTP routers per service role
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloudevents_hub::{Candidate, DeliveryQueue, Event, WebhookSender};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let queue = Arc::new(DeliveryQueue::new(1000, 3));
//!     let consumer = queue.spawn(WebhookSender::new()?, "http://localhost:4000");
//!
//!     let event = Event::new(Candidate::new(
//!         "com.library.book.borrowed:v1",
//!         "https://library.example.com",
//!         "/users/12345",
//!         serde_json::json!({"book": "Dune"}),
//!     ))?;
//!     queue.enqueue(event).await?;
//!
//!     queue.shutdown();
//!     consumer.await??;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bus;
pub mod config;
pub mod delivery;
pub mod event_store;
pub mod queue;
pub mod types;
pub mod validation;

// Re-export commonly used items at crate root
pub use bus::{PublishError, Publisher};
pub use delivery::{Deliver, DeliveryError, WebhookSender};
pub use event_store::{EventStore, SnapshotConfig, StoreError};
pub use queue::{DeliveryQueue, QueueError};
pub use types::{Candidate, Event, EventError, EventId, EventRecord, QueueItem};
pub use validation::ValidationError;

/// Result type for fallible top-level operations
pub type HubResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
