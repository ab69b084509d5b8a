//! fetch/http — blocking HTTP fetcher for the values page.

use log::{debug, info};
use std::time::Duration;

use super::html::parse_values;
use super::Fetcher;
use crate::error::FetchError;
use crate::metrics;
use crate::snapshot::ValueMap;

pub struct HttpFetcher {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new<S: Into<String>>(url: S, timeout: Duration) -> Result<Self, FetchError> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("valuetrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http {
                url: url.clone(),
                reason: format!("build client: {e}"),
            })?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn get_body(&self) -> Result<String, FetchError> {
        let response = self.client.get(&self.url).send().map_err(|e| FetchError::Http {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        response.text().map_err(|e| FetchError::Body {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self) -> Result<ValueMap, FetchError> {
        let body = self.get_body()?;
        debug!("fetched {} B from {}", body.len(), self.url);

        let page = parse_values(&body);
        metrics::record_parse_skipped(page.skipped);
        if page.values.is_empty() {
            return Err(FetchError::NoItems {
                blocks: page.blocks,
                skipped: page.skipped,
            });
        }
        if page.skipped > 0 {
            info!(
                "{} of {} items skipped (value not an integer or markup incomplete)",
                page.skipped, page.blocks
            );
        }
        Ok(page.values)
    }
}
