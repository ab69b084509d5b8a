//! Series materialization: history -> one time series per key.
//!
//! Pure functions, recomputed on every read. Key universe is the union of all
//! keys across the history; a key only gets points for the snapshots that
//! contain it (no interpolation, no gap filling), in history order.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub timestamp: String,
    pub value: i64,
}

/// Key -> points in history order.
pub type SeriesMap = BTreeMap<String, Vec<Point>>;

/// One chart trace, shaped for Plotly (`x`, `y`, `mode`, `name`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<i64>,
    pub mode: &'static str,
}

pub fn materialize(history: &[Snapshot]) -> SeriesMap {
    let mut out = SeriesMap::new();
    for snap in history {
        for (key, &value) in &snap.values {
            out.entry(key.clone()).or_default().push(Point {
                timestamp: snap.timestamp.clone(),
                value,
            });
        }
    }
    out
}

/// Every key observed in at least one snapshot.
pub fn keys(history: &[Snapshot]) -> BTreeSet<String> {
    history
        .iter()
        .flat_map(|s| s.values.keys().cloned())
        .collect()
}

pub fn to_traces(series: &SeriesMap) -> Vec<Trace> {
    series
        .iter()
        .map(|(name, points)| Trace {
            name: name.clone(),
            x: points.iter().map(|p| p.timestamp.clone()).collect(),
            y: points.iter().map(|p| p.value).collect(),
            mode: "lines+markers",
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ValueMap;

    fn snap(ts: &str, kv: &[(&str, i64)]) -> Snapshot {
        let values: ValueMap = kv.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Snapshot::new(ts, values)
    }

    #[test]
    fn traces_follow_series_points() {
        let h = vec![snap("t1", &[("A", 1)]), snap("t2", &[("A", 5)])];
        let traces = to_traces(&materialize(&h));
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].name, "A");
        assert_eq!(traces[0].x, vec!["t1", "t2"]);
        assert_eq!(traces[0].y, vec![1, 5]);
        assert_eq!(traces[0].mode, "lines+markers");
    }

    #[test]
    fn empty_snapshots_contribute_nothing() {
        let h = vec![snap("t1", &[]), snap("t2", &[])];
        assert!(materialize(&h).is_empty());
        assert!(keys(&h).is_empty());
    }
}
