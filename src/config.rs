//! Centralized configuration and builder for valuetrack.
//!
//! - TrackerConfig::from_env() reads the VT_* variables (plus PORT).
//! - Fluent `with_*` setters override single fields; the CLI applies its flags
//!   on top of the env-derived config.
//!
//! Env:
//! - VT_SOURCE_URL          page to scrape
//! - VT_HISTORY_FILE        history JSON path (default pet_values_history.json)
//! - VT_BIND_HOST           listen host (default 0.0.0.0)
//! - PORT                   listen port (default 10000)
//! - VT_HTTP_WORKERS        request handler threads (default 4)
//! - VT_FETCH_TIMEOUT_SECS  fetch timeout (default 30)
//! - VT_SCHEDULE_HOURS      daily ingest hour window, "1-5" or "3"
//! - VT_INTERVAL_SECS       fixed interval instead of the daily schedule
//! - VT_INITIAL_INGEST      ingest once at startup (default on)
//! - VT_DATA_FSYNC          fsync history on every persist (default on)

use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://www.adopt-me-values.com/pets";
pub const DEFAULT_HISTORY_FILE: &str = "pet_values_history.json";
pub const DEFAULT_PORT: u16 = 10000;

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Env: VT_SOURCE_URL
    pub source_url: String,

    /// Env: VT_HISTORY_FILE
    pub history_file: PathBuf,

    /// Env: VT_BIND_HOST (default "0.0.0.0")
    pub bind_host: String,

    /// Env: PORT (default 10000)
    pub port: u16,

    /// Env: VT_HTTP_WORKERS (default 4, min 1)
    pub http_workers: usize,

    /// Env: VT_FETCH_TIMEOUT_SECS (default 30)
    pub fetch_timeout_secs: u64,

    /// Daily ingest hour window, inclusive.
    /// Env: VT_SCHEDULE_HOURS = "1-5" (default) | "3"
    pub schedule_hours: (u32, u32),

    /// Fixed interval in seconds; overrides the daily schedule when set.
    /// Env: VT_INTERVAL_SECS
    pub interval_secs: Option<u64>,

    /// Env: VT_INITIAL_INGEST = 0|1 (default 1)
    pub initial_ingest: bool,

    /// Env: VT_DATA_FSYNC = 0|1 (default 1)
    pub data_fsync: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            http_workers: 4,
            fetch_timeout_secs: 30,
            schedule_hours: (1, 5),
            interval_secs: None,
            initial_ingest: true,
            data_fsync: true,
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// "1-5" -> (1, 5); "3" -> (3, 3). Hours above 23 or a reversed range -> None.
pub fn parse_hour_window(v: &str) -> Option<(u32, u32)> {
    let v = v.trim();
    let (lo, hi) = match v.split_once('-') {
        Some((a, b)) => (a.trim().parse().ok()?, b.trim().parse().ok()?),
        None => {
            let h = v.parse().ok()?;
            (h, h)
        }
    };
    if lo > hi || hi > 23 {
        return None;
    }
    Some((lo, hi))
}

impl TrackerConfig {
    /// Defaults overridden by whatever env variables are set and valid.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` with an explicit variable source.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = get("VT_SOURCE_URL") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.source_url = s.to_string();
            }
        }

        if let Some(v) = get("VT_HISTORY_FILE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.history_file = PathBuf::from(s);
            }
        }

        if let Some(v) = get("VT_BIND_HOST") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.bind_host = s.to_string();
            }
        }

        if let Some(v) = get("PORT") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.port = n;
            }
        }

        if let Some(v) = get("VT_HTTP_WORKERS") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.http_workers = n.max(1);
            }
        }

        if let Some(v) = get("VT_FETCH_TIMEOUT_SECS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.fetch_timeout_secs = n;
            }
        }

        if let Some(w) = get("VT_SCHEDULE_HOURS").as_deref().and_then(parse_hour_window) {
            cfg.schedule_hours = w;
        }

        if let Some(v) = get("VT_INTERVAL_SECS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.interval_secs = (n > 0).then_some(n);
            }
        }

        if let Some(b) = get("VT_INITIAL_INGEST").as_deref().and_then(parse_flag) {
            cfg.initial_ingest = b;
        }

        if let Some(b) = get("VT_DATA_FSYNC").as_deref().and_then(parse_flag) {
            cfg.data_fsync = b;
        }

        cfg
    }

    // Fluent setters (builder-style) to override specific fields.

    pub fn with_source_url<S: Into<String>>(mut self, url: S) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_history_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.history_file = path.into();
        self
    }

    pub fn with_bind_host<S: Into<String>>(mut self, host: S) -> Self {
        self.bind_host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_http_workers(mut self, n: usize) -> Self {
        self.http_workers = n.max(1);
        self
    }

    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    pub fn with_schedule_hours(mut self, lo: u32, hi: u32) -> Self {
        self.schedule_hours = (lo.min(23), hi.min(23).max(lo.min(23)));
        self
    }

    pub fn with_interval_secs(mut self, secs: Option<u64>) -> Self {
        self.interval_secs = secs.filter(|&s| s > 0);
        self
    }

    pub fn with_initial_ingest(mut self, on: bool) -> Self {
        self.initial_ingest = on;
        self
    }

    pub fn with_data_fsync(mut self, on: bool) -> Self {
        self.data_fsync = on;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn schedule_window(&self) -> RangeInclusive<u32> {
        self.schedule_hours.0..=self.schedule_hours.1
    }
}

impl fmt::Display for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackerConfig {{ \
             source_url: {}, \
             history_file: {}, \
             addr: {}, \
             http_workers: {}, \
             fetch_timeout_secs: {}, \
             schedule: {}, \
             initial_ingest: {}, \
             data_fsync: {} \
             }}",
            self.source_url,
            self.history_file.display(),
            self.addr(),
            self.http_workers,
            self.fetch_timeout_secs,
            match self.interval_secs {
                Some(s) => format!("every {}s", s),
                None => format!("daily, hours {}-{}", self.schedule_hours.0, self.schedule_hours.1),
            },
            self.initial_ingest,
            self.data_fsync,
        )
    }
}
