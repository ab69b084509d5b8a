//! store — durable append-only snapshot history.
//!
//! - mod.rs: HistoryStore (open/open_ro, append, latest, all).
//! - io.rs: history file read and atomic rewrite.
//!
//! Concurrency model (single writer, many readers):
//! - the in-memory history is an `Arc<[Snapshot]>` behind a RwLock;
//! - `append` holds the writer mutex across read-modify-persist, and swaps
//!   the Arc only after the file rename succeeded;
//! - readers clone the Arc, so they see the pre- or post-append history and
//!   never a partially built one.
//!
//! A writable store also holds the fs2 writer lock on `<history>.lock`.

pub mod io;

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::StoreError;
use crate::lock::{try_acquire_writer_lock, LockGuard};
use crate::snapshot::{Snapshot, ValueMap};

pub struct HistoryStore {
    path: PathBuf,
    current: RwLock<Arc<[Snapshot]>>,
    /// None for read-only stores.
    writer: Option<Mutex<LockGuard>>,
    fsync: bool,
}

impl HistoryStore {
    /// Open (or start) a writable history at `path`, fsync on every persist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_fsync(path, true)
    }

    /// Writable open with explicit fsync policy.
    ///
    /// Missing file: empty history (the file is created on first append).
    /// Unreadable or corrupt file: `StoreError::Read` / `StoreError::Corrupt`.
    pub fn open_with_fsync<P: AsRef<Path>>(path: P, fsync: bool) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Persist {
                    path: path.clone(),
                    source: e,
                })?;
            }
        }

        let guard = try_acquire_writer_lock(&path).map_err(|e| StoreError::Locked {
            path: path.clone(),
            source: e,
        })?;
        debug!("writer lock taken: {}", guard.path().display());

        let history = load(&path)?;
        io::remove_stale_tmp(&path);

        Ok(Self {
            path,
            current: RwLock::new(history.into()),
            writer: Some(Mutex::new(guard)),
            fsync,
        })
    }

    /// Read-only view of a history file; no lock, `append` returns `ReadOnly`.
    pub fn open_ro<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let history = load(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(history.into()),
            writer: None,
            fsync: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    /// Record `values` under the current timestamp and persist the history.
    pub fn append(&self, values: ValueMap) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot::now(values);
        self.append_snapshot(snapshot.clone())?;
        Ok(snapshot)
    }

    /// Append a pre-built snapshot (explicit timestamp) and persist.
    ///
    /// On persist failure neither the file nor the in-memory history change.
    pub fn append_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let writer = self.writer.as_ref().ok_or(StoreError::ReadOnly)?;
        let _w = writer.lock().unwrap_or_else(PoisonError::into_inner);

        let base = self.all();
        let mut next = Vec::with_capacity(base.len() + 1);
        next.extend_from_slice(&base);
        next.push(snapshot);

        io::write_history(&self.path, &next, self.fsync)?;

        let next: Arc<[Snapshot]> = next.into();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }

    /// Most recently appended snapshot; `None` on an empty history.
    pub fn latest(&self) -> Option<Snapshot> {
        self.all().last().cloned()
    }

    /// Full history in append order. The returned view is immutable and
    /// unaffected by later appends.
    pub fn all(&self) -> Arc<[Snapshot]> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load(path: &Path) -> Result<Vec<Snapshot>, StoreError> {
    match io::read_history(path)? {
        Some(h) => {
            info!("loaded {} snapshots from {}", h.len(), path.display());
            Ok(h)
        }
        None => {
            info!("no history at {}, starting empty", path.display());
            Ok(Vec::new())
        }
    }
}
