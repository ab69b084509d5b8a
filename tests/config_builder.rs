// tests/config_builder.rs
//
// TrackerConfig: env parsing (through an explicit lookup so tests do not
// touch the process environment) and builder overrides.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use valuetrack::cli::cadence_for;
use valuetrack::config::{DEFAULT_HISTORY_FILE, DEFAULT_PORT};
use valuetrack::schedule::Cadence;
use valuetrack::TrackerConfig;

fn from_pairs(pairs: &[(&str, &str)]) -> TrackerConfig {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    TrackerConfig::from_lookup(|k| env.get(k).cloned())
}

#[test]
fn defaults_without_env() {
    let cfg = from_pairs(&[]);
    assert_eq!(cfg.history_file, PathBuf::from(DEFAULT_HISTORY_FILE));
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.addr(), "0.0.0.0:10000");
    assert_eq!(cfg.schedule_hours, (1, 5));
    assert_eq!(cfg.interval_secs, None);
    assert!(cfg.initial_ingest);
    assert!(cfg.data_fsync);
    assert_eq!(cfg.fetch_timeout(), Duration::from_secs(30));
}

#[test]
fn env_overrides_are_applied() {
    let cfg = from_pairs(&[
        ("VT_SOURCE_URL", " https://example.test/pets "),
        ("VT_HISTORY_FILE", "/var/lib/vt/history.json"),
        ("PORT", "8080"),
        ("VT_BIND_HOST", "127.0.0.1"),
        ("VT_HTTP_WORKERS", "0"),
        ("VT_FETCH_TIMEOUT_SECS", "5"),
        ("VT_SCHEDULE_HOURS", "2-3"),
        ("VT_INTERVAL_SECS", "600"),
        ("VT_INITIAL_INGEST", "off"),
        ("VT_DATA_FSYNC", "0"),
    ]);
    assert_eq!(cfg.source_url, "https://example.test/pets");
    assert_eq!(cfg.history_file, PathBuf::from("/var/lib/vt/history.json"));
    assert_eq!(cfg.addr(), "127.0.0.1:8080");
    assert_eq!(cfg.http_workers, 1, "workers clamp to at least one");
    assert_eq!(cfg.fetch_timeout_secs, 5);
    assert_eq!(cfg.schedule_hours, (2, 3));
    assert_eq!(cfg.interval_secs, Some(600));
    assert!(!cfg.initial_ingest);
    assert!(!cfg.data_fsync);
}

#[test]
fn invalid_env_values_keep_defaults() {
    let cfg = from_pairs(&[
        ("PORT", "http"),
        ("VT_SCHEDULE_HOURS", "5-1"),
        ("VT_INTERVAL_SECS", "0"),
        ("VT_INITIAL_INGEST", "sometimes"),
        ("VT_SOURCE_URL", "   "),
    ]);
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.schedule_hours, (1, 5));
    assert_eq!(cfg.interval_secs, None);
    assert!(cfg.initial_ingest);
    assert_eq!(cfg.source_url, TrackerConfig::default().source_url);
}

#[test]
fn builder_setters_override_env() {
    let cfg = from_pairs(&[("PORT", "8080")])
        .with_port(9000)
        .with_history_file("h.json")
        .with_schedule_hours(4, 2)
        .with_interval_secs(Some(0))
        .with_data_fsync(false);
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.history_file, PathBuf::from("h.json"));
    assert_eq!(cfg.schedule_hours, (4, 4), "reversed window collapses to its start");
    assert_eq!(cfg.interval_secs, None);
    assert!(!cfg.data_fsync);

    let shown = cfg.to_string();
    assert!(shown.contains("h.json"));
    assert!(shown.contains("daily, hours 4-4"));
}

#[test]
fn cadence_follows_config() {
    let daily = TrackerConfig::default().with_schedule_hours(3, 3);
    match cadence_for(&daily) {
        Cadence::Daily(d) => assert_eq!(chrono::Timelike::hour(&d.time()), 3),
        other => panic!("expected daily cadence, got {other:?}"),
    }

    let every = TrackerConfig::default().with_interval_secs(Some(30));
    assert_eq!(cadence_for(&every), Cadence::Every(Duration::from_secs(30)));
}
