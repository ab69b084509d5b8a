//! Error types for valuetrack.
//!
//! Library code returns these typed errors; the CLI wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the snapshot store (load and persist side).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("read history {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("persist history {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("history {path:?} is locked by another writer: {source}")]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history store was opened read-only")]
    ReadOnly,
}

impl StoreError {
    /// Errors raised while loading persisted state at startup.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, StoreError::Read { .. } | StoreError::Corrupt { .. })
    }
}

/// Failures of the page fetcher. Recovered at the ingest boundary.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("read body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("no items found on page ({blocks} item blocks, {skipped} skipped)")]
    NoItems { blocks: usize, skipped: usize },
}
