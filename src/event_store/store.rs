//! Event Store - primary map and secondary indices
//!
//! All map and index access goes through a single `RwLock`, so concurrent
//! HTTP handlers can add and query events safely.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::types::{Candidate, Event, EventId};
use crate::validation::ValidationError;

/// Threshold for sorting results in parallel (event count)
const PARALLEL_SORT_THRESHOLD: usize = 1000;

/// Result type for EventStore operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in EventStore operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No snapshot file yet; callers usually start with an empty store
    #[error("snapshot not found: {}", .0.display())]
    SnapshotNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The snapshot writer did not finish in time and was left running
    #[error("snapshot write did not finish within {0:?}")]
    PersistTimeout(Duration),
    #[error("snapshot writer exited without a result")]
    PersistAborted,
}

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    type_index: HashMap<String, Vec<EventId>>,
    subject_index: HashMap<String, Vec<EventId>>,
}

impl Inner {
    fn index(&mut self, event: &Event) {
        self.type_index
            .entry(event.event_type().to_string())
            .or_default()
            .push(event.id());
        self.subject_index
            .entry(event.subject().to_string())
            .or_default()
            .push(event.id());
    }

    fn resolve(&self, ids: Option<&Vec<EventId>>) -> Vec<Event> {
        let mut events: Vec<Event> = ids
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.events.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        sort_by_time(&mut events);
        events
    }
}

/// Sort events by timestamp, oldest first. Ties keep no particular order.
fn sort_by_time(events: &mut [Event]) {
    if events.len() > PARALLEL_SORT_THRESHOLD {
        events.par_sort_by_key(|e| e.time());
    } else {
        events.sort_by_key(|e| e.time());
    }
}

/// In-memory event repository with type and subject indices
#[derive(Debug, Default)]
pub struct EventStore {
    inner: RwLock<Inner>,
}

impl EventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated events and index them
    ///
    /// A repeated identifier keeps the last occurrence.
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let events = events.into_iter().map(|e| (e.id(), e)).collect();
        let store = Self {
            inner: RwLock::new(Inner {
                events,
                ..Default::default()
            }),
        };
        store.rebuild_indexes();
        store
    }

    /// Validate a candidate, store the resulting event and index it
    pub fn add_event(&self, candidate: Candidate) -> Result<Event, ValidationError> {
        let event = Event::new(candidate)?;

        let mut inner = self.inner.write();
        inner.index(&event);
        inner.events.insert(event.id(), event.clone());

        Ok(event)
    }

    /// Look up a single event
    pub fn get_event(&self, id: &EventId) -> Option<Event> {
        self.inner.read().events.get(id).cloned()
    }

    /// All events, oldest first
    pub fn get_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.inner.read().events.values().cloned().collect();
        sort_by_time(&mut events);
        events
    }

    /// Events with the given `type`, oldest first; empty for an unknown type
    pub fn get_events_by_type(&self, event_type: &str) -> Vec<Event> {
        let inner = self.inner.read();
        inner.resolve(inner.type_index.get(event_type))
    }

    /// Events with the given `subject`, oldest first; empty for an unknown subject
    pub fn get_events_by_subject(&self, subject: &str) -> Vec<Event> {
        let inner = self.inner.read();
        inner.resolve(inner.subject_index.get(subject))
    }

    /// Discard both indices and rebuild them from the primary map
    ///
    /// Buckets are ordered by event time (then id), which is the order
    /// `add_event` would have produced.
    pub fn rebuild_indexes(&self) {
        let mut inner = self.inner.write();
        inner.type_index.clear();
        inner.subject_index.clear();

        let mut events: Vec<Event> = inner.events.values().cloned().collect();
        events.sort_by(|a, b| a.time().cmp(&b.time()).then(a.id().cmp(&b.id())));
        for event in &events {
            inner.index(event);
        }
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the `type` index
    pub fn type_index(&self) -> HashMap<String, Vec<EventId>> {
        self.inner.read().type_index.clone()
    }

    /// Copy of the `subject` index
    pub fn subject_index(&self) -> HashMap<String, Vec<EventId>> {
        self.inner.read().subject_index.clone()
    }
}
