// tests/concurrent_readers.rs
//
// One writer appends while several readers hammer all()/latest(). Every view a
// reader gets must be a whole prefix of the final history (entry i carries
// seq=i, nothing missing, nothing half-built), and views never shrink.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use valuetrack::{HistoryStore, ValueMap};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("vttest-conc-{prefix}-{pid}-{t}-{id}"))
}

fn seq_values(i: i64) -> ValueMap {
    let mut m = ValueMap::new();
    m.insert("seq".to_string(), i);
    // a few more keys so each snapshot is not a single field
    for k in 0..8 {
        m.insert(format!("item-{k}"), i * 100 + k);
    }
    m
}

#[test]
fn readers_never_observe_torn_history() -> Result<()> {
    const APPENDS: i64 = 150;
    const READERS: usize = 4;

    let root = unique_root("torn");
    let store = Arc::new(HistoryStore::open_with_fsync(root.join("history.json"), false)?);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || -> usize {
                let mut last_len = 0usize;
                let mut views = 0usize;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    let view = store.all();
                    assert!(
                        view.len() >= last_len,
                        "history shrank: {} -> {}",
                        last_len,
                        view.len()
                    );
                    for (i, snap) in view.iter().enumerate() {
                        assert_eq!(
                            snap.get("seq"),
                            Some(i as i64),
                            "entry {i} torn or out of order"
                        );
                        assert_eq!(snap.values.len(), 9, "entry {i} partially built");
                    }
                    if let Some(latest) = store.latest() {
                        assert!(latest.get("seq").unwrap_or(-1) >= last_len as i64 - 1);
                    }
                    last_len = view.len();
                    views += 1;
                    if finished {
                        break;
                    }
                }
                views
            })
        })
        .collect();

    for i in 0..APPENDS {
        let before = store.len();
        store.append(seq_values(i))?;
        let after = store.len();
        assert_eq!(after, before + 1, "single writer: each append adds one entry");
    }
    done.store(true, Ordering::SeqCst);

    for r in readers {
        let views = r.join().expect("reader panicked");
        assert!(views > 0);
    }

    assert_eq!(store.len(), APPENDS as usize);
    drop(store);
    let reopened = HistoryStore::open_ro(root.join("history.json"))?;
    assert_eq!(reopened.len(), APPENDS as usize);
    Ok(())
}

#[test]
fn concurrent_appends_are_serialized() -> Result<()> {
    const WRITERS: i64 = 4;
    const EACH: i64 = 20;

    let root = unique_root("serial");
    let store = Arc::new(HistoryStore::open_with_fsync(root.join("history.json"), false)?);

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..EACH {
                    let mut m = ValueMap::new();
                    m.insert(format!("writer-{w}"), i);
                    store.append(m).expect("append");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("writer panicked");
    }

    assert_eq!(store.len(), (WRITERS * EACH) as usize, "no append lost");
    // per-writer order is preserved
    for w in 0..WRITERS {
        let key = format!("writer-{w}");
        let seq: Vec<i64> = store.all().iter().filter_map(|s| s.get(&key)).collect();
        assert_eq!(seq, (0..EACH).collect::<Vec<_>>());
    }
    Ok(())
}
