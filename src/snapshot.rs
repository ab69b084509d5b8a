//! Snapshot — one timestamped observation of all tracked item values.
//!
//! On-disk shape (one element of the history JSON array):
//!   {"timestamp": "2026-10-19 03:41:07.518204", "values": {"Shadow Dragon": 350, ...}}
//!
//! A key missing from `values` means "not observed at that time", never zero.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item name -> integer value, as produced by a fetcher.
pub type ValueMap = BTreeMap<String, i64>;

/// Timestamp layout used for new snapshots (local time, microseconds).
/// Strings sort chronologically only while the local UTC offset stays fixed
/// (not across a DST fall-back); history order is authoritative.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub values: ValueMap,
}

impl Snapshot {
    pub fn new<S: Into<String>>(timestamp: S, values: ValueMap) -> Self {
        Self {
            timestamp: timestamp.into(),
            values,
        }
    }

    /// Snapshot stamped with the current local wall-clock time.
    pub fn now(values: ValueMap) -> Self {
        Self::new(format_timestamp(&Local::now()), values)
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parsed timestamp, if it uses the layout written by this crate.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

pub fn format_timestamp(t: &DateTime<Local>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts the full layout and the variant without fractional seconds.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_roundtrips_through_parse() {
        let s = Snapshot::now(ValueMap::new());
        let parsed = s.parsed_timestamp().expect("own layout must parse");
        assert_eq!(parsed.format(TIMESTAMP_FORMAT).to_string(), s.timestamp);
    }

    #[test]
    fn parses_second_precision_timestamps() {
        assert!(parse_timestamp("2025-01-02 03:04:05").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn json_shape_matches_history_file() {
        let mut values = ValueMap::new();
        values.insert("Frost Dragon".into(), 1200);
        let s = Snapshot::new("2025-01-02 03:04:05.000001", values);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["timestamp"], "2025-01-02 03:04:05.000001");
        assert_eq!(json["values"]["Frost Dragon"], 1200);
    }
}
