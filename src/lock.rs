//! Writer lock for a history file.
//!
//! Cross-platform (fs2) advisory lock on `<history>.lock`, taken by a writable
//! `HistoryStore` so that two processes never append to the same history.
//! Read-only opens do not lock.
//!
//! Lock is released on Drop.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

/// `<dir>/<name>.lock` next to the history file.
pub fn lock_file_path(history: &Path) -> PathBuf {
    let mut name = history
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history".into());
    name.push(".lock");
    history.with_file_name(name)
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)
}

/// Try to take the writer lock. Fails immediately if another writer holds it.
pub fn try_acquire_writer_lock(history: &Path) -> io::Result<LockGuard> {
    let path = lock_file_path(history);
    let file = open_lock_file(&path)?;
    file.try_lock_exclusive()?;
    Ok(LockGuard { file, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_sits_next_to_history() {
        let p = lock_file_path(Path::new("/data/pet_values_history.json"));
        assert_eq!(p, PathBuf::from("/data/pet_values_history.json.lock"));
    }
}
