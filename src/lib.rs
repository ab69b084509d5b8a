// Core: snapshot history and its series view
pub mod snapshot;
pub mod store;  // src/store/{mod,io}.rs
pub mod series;

pub mod error;
pub mod lock;
pub mod config;
pub mod metrics;

// Ingest side: page fetcher, one-shot ingest, background schedule
pub mod fetch;  // src/fetch/{mod,http,html}.rs
pub mod ingest;
pub mod schedule;

// Read side
pub mod server; // src/server/{mod,page}.rs
pub mod cli;

pub use config::TrackerConfig;
pub use error::{FetchError, StoreError};
pub use fetch::{Fetcher, HttpFetcher};
pub use ingest::{ingest_once, IngestOutcome};
pub use series::{materialize, Point, SeriesMap};
pub use snapshot::{Snapshot, ValueMap};
pub use store::HistoryStore;
