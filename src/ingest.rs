//! One ingest cycle: fetch values, append a snapshot, persist.
//!
//! Fetch and persist failures are logged and reported in the outcome; they
//! never escape as errors, so a scheduler loop keeps running and the next
//! cycle starts from a clean slate.

use log::{error, info, warn};

use crate::fetch::Fetcher;
use crate::metrics;
use crate::store::HistoryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Snapshot appended with this many keys.
    Appended { keys: usize, timestamp: String },
    /// Nothing recorded for this cycle.
    FetchFailed(String),
    /// Values fetched but not persisted; history unchanged.
    PersistFailed(String),
}

impl IngestOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, IngestOutcome::Appended { .. })
    }
}

pub fn ingest_once(store: &HistoryStore, fetcher: &dyn Fetcher) -> IngestOutcome {
    metrics::record_ingest_run();

    let values = match fetcher.fetch() {
        Ok(v) => v,
        Err(e) => {
            metrics::record_ingest_fetch_failure();
            warn!("fetch failed, no snapshot this cycle: {}", e);
            return IngestOutcome::FetchFailed(e.to_string());
        }
    };

    let keys = values.len();
    match store.append(values) {
        Ok(snap) => {
            metrics::record_ingest_appended();
            info!("[{}] values updated ({} items)", snap.timestamp, keys);
            IngestOutcome::Appended {
                keys,
                timestamp: snap.timestamp,
            }
        }
        Err(e) => {
            metrics::record_ingest_persist_failure();
            error!("persist failed, snapshot dropped until next cycle: {}", e);
            IngestOutcome::PersistFailed(e.to_string())
        }
    }
}
