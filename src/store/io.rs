//! store/io — history file read and atomic rewrite.
//!
//! The whole history lives in one pretty-printed JSON array. Every persist
//! writes `<file_name>.tmp` in the same directory, fsyncs it and renames it
//! over the target, so the history file is either the old or the new version.

use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::metrics;
use crate::snapshot::Snapshot;

/// Temp file used by `write_history` (`<file_name>.tmp` next to the target).
///
/// Appended, not substituted: the temp name never equals the history file
/// and never collides with a sibling history that shares the stem.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read the history file.
///
/// Returns `Ok(None)` when the file does not exist. A zero-length (or
/// whitespace-only) file carries no snapshots and reads as an empty history.
pub fn read_history(path: &Path) -> Result<Option<Vec<Snapshot>>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if text.trim().is_empty() {
        warn!("history {} is empty, starting from zero snapshots", path.display());
        return Ok(Some(Vec::new()));
    }

    let history: Vec<Snapshot> =
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(Some(history))
}

/// Rewrite the history file atomically (tmp + fsync + rename).
pub fn write_history(path: &Path, history: &[Snapshot], fsync: bool) -> Result<(), StoreError> {
    let persist_err = |e: std::io::Error| StoreError::Persist {
        path: path.to_path_buf(),
        source: e,
    };

    let json = serde_json::to_vec_pretty(history)?;
    let tmp = tmp_path(path);
    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(persist_err)?;
        f.write_all(&json).map_err(persist_err)?;
        f.flush().map_err(persist_err)?;
        if fsync {
            f.sync_all().map_err(persist_err)?;
        }
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(persist_err(e));
    }
    if fsync {
        sync_parent_dir(path);
    }

    metrics::record_store_persist(json.len());
    debug!(
        "persisted {} snapshots ({} B) to {}",
        history.len(),
        json.len(),
        path.display()
    );
    Ok(())
}

/// Leftover temp file from an interrupted persist; the target is still intact.
pub fn remove_stale_tmp(path: &Path) {
    let tmp = tmp_path(path);
    if tmp.is_file() {
        match fs::remove_file(&tmp) {
            Ok(()) => debug!("removed stale {}", tmp.display()),
            Err(e) => warn!("cannot remove stale {}: {}", tmp.display(), e),
        }
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    // Directory fsync makes the rename durable; failure here is not fatal.
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
