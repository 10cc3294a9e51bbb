use crate::platform::{CacheError, KvStore};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// A [`KvStore`] persisted as a single JSON object on disk.
///
/// Reads and writes go to the in-memory map and never touch the disk. Every write hands a snapshot to a background
/// writer task that rewrites the file through a temporary file and a rename; snapshots queued while a write is in
/// flight collapse into the latest one. `flush` waits until everything written so far is on disk.
#[derive(Debug)]
pub struct FileKvStore {
    state: Mutex<State>,
    snapshots: watch::Sender<Snapshot>,
    persisted: watch::Receiver<Persisted>,
}

#[derive(Debug)]
struct State {
    version: u64,
    entries: Entries,
}

#[derive(Clone, Debug)]
struct Snapshot {
    version: u64,
    entries: Entries,
}

#[derive(Clone, Debug)]
struct Persisted {
    version: u64,
    error: Option<String>,
}

impl FileKvStore {
    /// Opens the store at `path` and starts its writer task, so this must be called from within a Tokio runtime.
    /// A missing, unreadable or corrupt file yields an empty store that is overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => {
                debug!("💾 Opened position cache with {} entries", entries.len());
                entries
            }
            Err(e) => {
                warn!("⚠️ Unable to read position cache '{}', starting empty: {}", path.display(), e);
                Entries::new()
            }
        };

        let (snapshots, snapshot_rx) = watch::channel(Snapshot {
            version: 0,
            entries: entries.clone(),
        });
        let (persisted_tx, persisted) = watch::channel(Persisted { version: 0, error: None });
        tokio::spawn(write_snapshots(path, snapshot_rx, persisted_tx));

        FileKvStore {
            state: Mutex::new(State { version: 0, entries }),
            snapshots,
            persisted,
        }
    }

    /// Waits until every write made so far has reached the disk, reporting the outcome of the latest file write.
    pub async fn flush(&self) -> Result<(), CacheError> {
        let target = self.state.lock().map_err(|_| CacheError::Poisoned)?.version;
        let mut persisted = self.persisted.clone();

        let error = persisted
            .wait_for(|persisted| persisted.version >= target)
            .await
            .map_err(|_| CacheError::WriterStopped)?
            .error
            .clone();

        match error {
            Some(error) => Err(CacheError::Persist(error)),
            None => Ok(()),
        }
    }
}

async fn write_snapshots(path: PathBuf, mut snapshots: watch::Receiver<Snapshot>, persisted: watch::Sender<Persisted>) {
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();

        let error = match persist(&path, &snapshot.entries).await {
            Ok(()) => {
                debug!(version = snapshot.version, "💾 Wrote position cache");
                None
            }
            Err(e) => {
                warn!("⚠️ Unable to write position cache '{}': {}", path.display(), e);
                Some(e.to_string())
            }
        };

        persisted.send_replace(Persisted {
            version: snapshot.version,
            error,
        });
    }
}

async fn persist(path: &Path, entries: &Entries) -> Result<(), CacheError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn read_entries(path: &Path) -> Result<Entries, CacheError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
        Err(e) => Err(e.into()),
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(state.entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        state.entries.insert(key.to_string(), value.to_string());
        state.version += 1;

        self.snapshots.send_replace(Snapshot {
            version: state.version,
            entries: state.entries.clone(),
        });
        Ok(())
    }
}
