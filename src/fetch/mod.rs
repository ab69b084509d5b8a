//! fetch — where snapshot values come from.
//!
//! - mod.rs: the `Fetcher` seam used by ingest.
//! - http.rs: HttpFetcher (reqwest blocking client + page parser).
//! - html.rs: item extraction from the page markup.

pub mod html;
mod http;

pub use html::{parse_values, ParsedPage};
pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::snapshot::ValueMap;

/// Produces one item-name -> value mapping per call, or a typed failure.
pub trait Fetcher: Send + Sync {
    fn fetch(&self) -> Result<ValueMap, FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn() -> Result<ValueMap, FetchError> + Send + Sync,
{
    fn fetch(&self) -> Result<ValueMap, FetchError> {
        self()
    }
}
