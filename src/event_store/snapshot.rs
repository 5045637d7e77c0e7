//! Snapshot persistence for the Event Store
//!
//! A snapshot is a JSON array of events. Indices are never written; they
//! are rebuilt after loading.
//!
//! The file is overwritten in place. A crash in the middle of a write can
//! leave a truncated file behind, which then fails to load with a JSON error.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::store::{EventStore, StoreError, StoreResult};
use crate::types::Event;

/// File name of the snapshot inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "database.json";

/// Location of the store's snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
        }
    }
}

impl SnapshotConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to database.json
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE_NAME)
    }
}

impl EventStore {
    /// Write every stored event to `path` as a JSON array, oldest first
    pub fn persist_snapshot<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let path = path.as_ref();
        let events = self.get_events();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &events)?;
        writer.flush()?;

        tracing::info!(path = %path.display(), events = events.len(), "Persisted snapshot");
        Ok(())
    }

    /// Load a store from a snapshot written by [`persist_snapshot`](Self::persist_snapshot)
    ///
    /// Every event is re-validated while parsing. A missing file is reported
    /// as [`StoreError::SnapshotNotFound`].
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SnapshotNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let events: Vec<Event> = serde_json::from_reader(BufReader::new(file))?;
        let count = events.len();
        let store = Self::from_events(events);

        if store.len() != count {
            tracing::warn!(
                path = %path.display(),
                expected = count,
                loaded = store.len(),
                "Snapshot contained duplicate event ids"
            );
        }

        tracing::info!(path = %path.display(), events = store.len(), "Loaded snapshot");
        Ok(store)
    }

    /// Load the snapshot from `config`, or start empty if there is none yet
    pub fn open(config: &SnapshotConfig) -> StoreResult<Self> {
        match Self::load_snapshot(config.snapshot_path()) {
            Ok(store) => Ok(store),
            Err(StoreError::SnapshotNotFound(path)) => {
                tracing::info!(path = %path.display(), "No existing snapshot found, starting with an empty store");
                Ok(Self::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist to the snapshot path from `config`
    pub fn persist(&self, config: &SnapshotConfig) -> StoreResult<()> {
        self.persist_snapshot(config.snapshot_path())
    }

    /// Persist on a dedicated OS thread, waiting at most `timeout`
    ///
    /// On timeout the write keeps going on its own thread, but the caller is
    /// released and nothing in the runtime waits for it on shutdown.
    pub async fn persist_detached(
        self: &Arc<Self>,
        config: &SnapshotConfig,
        timeout: Duration,
    ) -> StoreResult<()> {
        let store = Arc::clone(self);
        let path = config.snapshot_path();
        run_detached(move || store.persist_snapshot(path), timeout).await?
    }
}

/// Run `f` on a new thread and wait up to `timeout` for its result
async fn run_detached<T, F>(f: F, timeout: Duration) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    thread::Builder::new()
        .name("snapshot-writer".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })?;

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(StoreError::PersistAborted),
        Err(_) => Err(StoreError::PersistTimeout(timeout)),
    }
}
