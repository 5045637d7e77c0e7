//! Indexed Event Store
//!
//! In-memory event repository with two secondary indices and JSON
//! snapshot persistence:
//! - `EventStore`: primary map keyed by event id plus `type` and `subject` indices
//! - `SnapshotConfig`: where the snapshot file lives
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌──────────────┐    ┌──────────────────────────┐
//! │ /add     │───►│ Event::new() │───►│ events + type/subject idx│
//! │ request  │    │ (validate)   │    │ (under write lock)       │
//! └──────────┘    └──────────────┘    └──────────────────────────┘
//!
//! Startup / Shutdown:
//! ┌───────────────────┐    ┌──────────────────┐
//! │ load database.json│───►│ rebuild_indexes()│───► Ready!
//! └───────────────────┘    └──────────────────┘
//! persist_snapshot() ───► database.json (events only, no indices)
//! ```

mod snapshot;
mod store;

pub use snapshot::SnapshotConfig;
pub use store::{EventStore, StoreError, StoreResult};
