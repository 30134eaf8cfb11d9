//! Crash-safe manifest of per-collection polling cursors (§4.1).
//!
//! All mutations go through a single writer lock; readers take a shared
//! lock and always receive deep copies so a caller can never observe a
//! state mid-mutation or hold a reference that outlives the lock guard.

pub mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use search_types::{CollectionSyncState, SyncStatus};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub use error::{Error, Result};

const SAVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    collections: HashMap<String, CollectionSyncState>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    last_saved: Option<OffsetDateTime>,
}

/// The in-memory, periodically-persisted sync-state manifest.
pub struct SyncStateStore {
    path: PathBuf,
    inner: RwLock<Manifest>,
}

impl SyncStateStore {
    /// Loads the manifest at `path` if present; a missing file is not an
    /// error (cold start, §4.1).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let manifest = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no sync-state manifest found, starting cold");
                Manifest::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(SyncStateStore { path, inner: RwLock::new(manifest) })
    }

    pub fn get(&self, collection_key: &str) -> Option<CollectionSyncState> {
        self.inner.read().collections.get(collection_key).cloned()
    }

    pub fn update(&self, collection_key: impl Into<String>, state: CollectionSyncState) {
        self.inner.write().collections.insert(collection_key.into(), state);
    }

    pub fn remove(&self, collection_key: &str) {
        self.inner.write().collections.remove(collection_key);
    }

    /// Deep copy of every tracked collection, for external readers (the
    /// `/indexes` route).
    pub fn snapshot_all(&self) -> Vec<CollectionSyncState> {
        self.inner.read().collections.values().cloned().collect()
    }

    pub fn set_last_poll_time(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        t: OffsetDateTime,
    ) {
        self.with_entry_mut(collection_key, index_name, timestamp_field, id_field, |s| {
            s.last_poll_time = t;
        });
    }

    pub fn set_last_sync_time(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        t: OffsetDateTime,
    ) {
        self.with_entry_mut(collection_key, index_name, timestamp_field, id_field, |s| {
            s.last_sync_time = Some(t);
        });
    }

    pub fn set_sync_status(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        status: SyncStatus,
    ) {
        self.with_entry_mut(collection_key, index_name, timestamp_field, id_field, |s| {
            s.sync_status = status;
        });
    }

    pub fn set_progress(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        progress: impl Into<String>,
    ) {
        let progress = progress.into();
        self.with_entry_mut(collection_key, index_name, timestamp_field, id_field, |s| {
            s.progress = progress.clone();
        });
    }

    pub fn set_total_documents(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        total: Option<u64>,
    ) {
        self.with_entry_mut(collection_key, index_name, timestamp_field, id_field, |s| {
            s.total_documents = total;
            s.recompute_progress();
        });
    }

    pub fn increment_documents_indexed(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        n: u64,
    ) {
        self.with_entry_mut(collection_key, index_name, timestamp_field, id_field, |s| {
            s.documents_indexed += n;
            s.recompute_progress();
        });
    }

    fn with_entry_mut(
        &self,
        collection_key: &str,
        index_name: &str,
        timestamp_field: &str,
        id_field: &str,
        f: impl FnOnce(&mut CollectionSyncState),
    ) {
        let mut guard = self.inner.write();
        let entry = guard.collections.entry(collection_key.to_string()).or_insert_with(|| {
            CollectionSyncState::new(collection_key, index_name, timestamp_field, id_field)
        });
        f(entry);
    }

    /// Serializes the manifest and atomically replaces the file on disk
    /// (§4.1's persistence contract).
    pub fn save(&self) -> Result<()> {
        let bytes = {
            let mut guard = self.inner.write();
            guard.last_saved = Some(OffsetDateTime::now_utc());
            serde_json::to_vec_pretty(&*guard)?
        };
        file_store::atomic_write(&self.path, &bytes)?;
        Ok(())
    }
}

/// Spawns the 30s background save loop (§4.1). The returned handle should
/// be aborted, and a final [`SyncStateStore::save`] issued, on shutdown.
pub fn spawn_background_save(store: Arc<SyncStateStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SAVE_INTERVAL);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            if let Err(e) = store.save() {
                warn!(error = %e, "periodic sync-state save failed");
            }
        }
    })
}

/// Performs the final save on shutdown, logging but not panicking on
/// failure — a failed final save must not block process exit.
pub fn save_on_shutdown(store: &SyncStateStore) {
    match store.save() {
        Ok(()) => info!("final sync-state manifest save completed"),
        Err(e) => warn!(error = %e, "final sync-state manifest save failed"),
    }
}

pub fn default_manifest_path(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join("sync_state.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cold_start_with_no_manifest_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SyncStateStore::load(dir.path().join("missing.json")).unwrap();
        assert!(store.snapshot_all().is_empty());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync_state.json");
        let store = SyncStateStore::load(&path).unwrap();
        store.set_total_documents("db.c", "idx", "_id", "_id", Some(10));
        store.increment_documents_indexed("db.c", "idx", "_id", "_id", 4);
        store.save().unwrap();

        let reloaded = SyncStateStore::load(&path).unwrap();
        let state = reloaded.get("db.c").unwrap();
        assert_eq!(state.documents_indexed, 4);
        assert_eq!(state.progress, "40%");
    }

    #[test]
    fn remove_drops_the_entry() {
        let dir = TempDir::new().unwrap();
        let store = SyncStateStore::load(dir.path().join("s.json")).unwrap();
        store.set_last_poll_time("db.c", "idx", "_id", "_id", OffsetDateTime::UNIX_EPOCH);
        assert!(store.get("db.c").is_some());
        store.remove("db.c");
        assert!(store.get("db.c").is_none());
    }

    #[test]
    fn snapshot_all_is_a_deep_copy() {
        let dir = TempDir::new().unwrap();
        let store = SyncStateStore::load(dir.path().join("s.json")).unwrap();
        store.set_total_documents("db.c", "idx", "_id", "_id", Some(2));
        let mut snapshot = store.snapshot_all();
        snapshot[0].documents_indexed = 999;
        assert_eq!(store.get("db.c").unwrap().documents_indexed, 0);
    }
}
