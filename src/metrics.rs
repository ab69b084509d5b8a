//! Lightweight global metrics for valuetrack.
//!
//! Thread-safe atomic counters for:
//! - ingest cycles (runs / appended / fetch failures / persist failures)
//! - parser (items skipped because the value was not an integer)
//! - store (bytes written per persist)
//! - http (requests served, not-found)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Ingest -----
static INGEST_RUNS: AtomicU64 = AtomicU64::new(0);
static INGEST_APPENDED: AtomicU64 = AtomicU64::new(0);
static INGEST_FETCH_FAILURES: AtomicU64 = AtomicU64::new(0);
static INGEST_PERSIST_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Parser -----
static PARSE_ITEMS_SKIPPED: AtomicU64 = AtomicU64::new(0);

// ----- Store -----
static STORE_PERSISTS: AtomicU64 = AtomicU64::new(0);
static STORE_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);

// ----- HTTP -----
static HTTP_REQUESTS: AtomicU64 = AtomicU64::new(0);
static HTTP_NOT_FOUND: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Ingest
    pub ingest_runs: u64,
    pub ingest_appended: u64,
    pub ingest_fetch_failures: u64,
    pub ingest_persist_failures: u64,

    // Parser
    pub parse_items_skipped: u64,

    // Store
    pub store_persists: u64,
    pub store_bytes_written: u64,

    // HTTP
    pub http_requests: u64,
    pub http_not_found: u64,
}

impl MetricsSnapshot {
    /// Share of ingest runs that appended a snapshot (0.0 when nothing ran).
    pub fn ingest_success_ratio(&self) -> f64 {
        if self.ingest_runs == 0 {
            0.0
        } else {
            self.ingest_appended as f64 / self.ingest_runs as f64
        }
    }
}

// ----- Recorders (Ingest) -----
pub fn record_ingest_run() {
    INGEST_RUNS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_ingest_appended() {
    INGEST_APPENDED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_ingest_fetch_failure() {
    INGEST_FETCH_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_ingest_persist_failure() {
    INGEST_PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Parser) -----
pub fn record_parse_skipped(n: usize) {
    PARSE_ITEMS_SKIPPED.fetch_add(n as u64, Ordering::Relaxed);
}

// ----- Recorders (Store) -----
pub fn record_store_persist(bytes: usize) {
    STORE_PERSISTS.fetch_add(1, Ordering::Relaxed);
    STORE_BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

// ----- Recorders (HTTP) -----
pub fn record_http_request() {
    HTTP_REQUESTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_http_not_found() {
    HTTP_NOT_FOUND.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        ingest_runs: INGEST_RUNS.load(Ordering::Relaxed),
        ingest_appended: INGEST_APPENDED.load(Ordering::Relaxed),
        ingest_fetch_failures: INGEST_FETCH_FAILURES.load(Ordering::Relaxed),
        ingest_persist_failures: INGEST_PERSIST_FAILURES.load(Ordering::Relaxed),

        parse_items_skipped: PARSE_ITEMS_SKIPPED.load(Ordering::Relaxed),

        store_persists: STORE_PERSISTS.load(Ordering::Relaxed),
        store_bytes_written: STORE_BYTES_WRITTEN.load(Ordering::Relaxed),

        http_requests: HTTP_REQUESTS.load(Ordering::Relaxed),
        http_not_found: HTTP_NOT_FOUND.load(Ordering::Relaxed),
    }
}

/// Prometheus text exposition of the current counters.
pub fn render_prometheus(m: &MetricsSnapshot, history_len: usize) -> String {
    let mut out = String::new();

    let ver = env!("CARGO_PKG_VERSION");
    out.push_str("# HELP valuetrack_build_info Build info.\n");
    out.push_str("# TYPE valuetrack_build_info gauge\n");
    out.push_str(&format!("valuetrack_build_info{{version=\"{}\"}} 1\n", ver));

    out.push_str("# HELP valuetrack_history_snapshots Snapshots currently in history.\n");
    out.push_str("# TYPE valuetrack_history_snapshots gauge\n");
    out.push_str(&format!("valuetrack_history_snapshots {}\n", history_len));

    out.push_str(
        "# HELP valuetrack_ingest_success_ratio Share of ingest cycles that appended a snapshot.\n",
    );
    out.push_str("# TYPE valuetrack_ingest_success_ratio gauge\n");
    out.push_str(&format!(
        "valuetrack_ingest_success_ratio {:.6}\n",
        m.ingest_success_ratio()
    ));

    let counters: [(&str, &str, u64); 9] = [
        ("ingest_runs_total", "Ingest cycles started.", m.ingest_runs),
        (
            "ingest_appended_total",
            "Ingest cycles that appended a snapshot.",
            m.ingest_appended,
        ),
        (
            "ingest_fetch_failures_total",
            "Ingest cycles skipped because the fetch failed.",
            m.ingest_fetch_failures,
        ),
        (
            "ingest_persist_failures_total",
            "Ingest cycles whose snapshot could not be persisted.",
            m.ingest_persist_failures,
        ),
        (
            "parse_items_skipped_total",
            "Items dropped because their value was not an integer.",
            m.parse_items_skipped,
        ),
        ("store_persists_total", "History file rewrites.", m.store_persists),
        ("store_bytes_written_total", "Bytes written to the history file.", m.store_bytes_written),
        ("http_requests_total", "HTTP requests served.", m.http_requests),
        ("http_not_found_total", "HTTP requests for unknown routes.", m.http_not_found),
    ];
    for (name, help, v) in counters {
        out.push_str(&format!("# HELP valuetrack_{} {}\n", name, help));
        out.push_str(&format!("# TYPE valuetrack_{} counter\n", name));
        out.push_str(&format!("valuetrack_{} {}\n", name, v));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_ratio_handles_zero_runs() {
        let m = MetricsSnapshot::default();
        assert_eq!(m.ingest_success_ratio(), 0.0);
        let m = MetricsSnapshot {
            ingest_runs: 4,
            ingest_appended: 3,
            ..Default::default()
        };
        assert!((m.ingest_success_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn prometheus_text_lists_every_counter() {
        let m = MetricsSnapshot {
            http_requests: 7,
            ..Default::default()
        };
        let text = render_prometheus(&m, 3);
        assert!(text.contains("valuetrack_history_snapshots 3\n"));
        assert!(text.contains("valuetrack_http_requests_total 7\n"));
        assert!(text.contains("# TYPE valuetrack_ingest_runs_total counter\n"));
        assert!(text.contains("valuetrack_ingest_success_ratio 0.000000\n"));
    }
}
