//! Background scheduler for ingest cycles.
//!
//! The production cadence is once a day at a time of day picked randomly at
//! process start (hour inside a configured window, any minute). A fixed
//! interval cadence exists for development and tests.
//!
//! The worker thread sleeps on a channel in bounded slices, so `stop()` returns
//! promptly and wall-clock jumps are picked up within one slice.

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use log::{debug, info, warn};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest single sleep before the next run time is re-checked.
const MAX_SLICE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// None when hour/minute are out of range.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|at| Self { at })
    }

    /// Random hour in `hours` (clamped to 0..=23), random minute in 0..=59.
    pub fn random<R: Rng>(hours: RangeInclusive<u32>, rng: &mut R) -> Self {
        let lo = (*hours.start()).min(23);
        let hi = (*hours.end()).min(23).max(lo);
        let hour = rng.gen_range(lo..=hi);
        let minute = rng.gen_range(0..=59);
        Self {
            at: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    /// First occurrence of the daily time strictly after `now`.
    /// Days where the local time does not exist (DST gap) are skipped.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut day = now.date_naive();
        for _ in 0..4 {
            if let Some(candidate) = tz.from_local_datetime(&day.and_time(self.at)).earliest() {
                if candidate > *now {
                    return candidate;
                }
            }
            match day.succ_opt() {
                Some(d) => day = d,
                None => break,
            }
        }
        one_day_after(now)
    }
}

/// `now` + 1 day; `now` itself at the end of the representable range.
fn one_day_after<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    now.clone()
        .checked_add_signed(chrono::Duration::days(1))
        .unwrap_or_else(|| now.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily(DailySchedule),
    Every(Duration),
}

impl Cadence {
    pub fn next_run_after(&self, now: &DateTime<Local>) -> DateTime<Local> {
        match self {
            Cadence::Daily(d) => d.next_run_after(now),
            Cadence::Every(interval) => {
                let next = chrono::Duration::from_std(*interval)
                    .ok()
                    .and_then(|step| now.clone().checked_add_signed(step));
                match next {
                    Some(t) => t,
                    None => {
                        warn!("interval {:?} out of range, next run in one day", interval);
                        one_day_after(now)
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cadence::Daily(d) => write!(f, "daily at {}", d.time().format("%H:%M")),
            Cadence::Every(i) => write!(f, "every {}s", i.as_secs()),
        }
    }
}

/// Running scheduler; dropping it stops the worker as well.
pub struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop the worker and wait for it (an in-flight job finishes first).
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `job` on `cadence` in a background thread.
pub fn spawn<F>(cadence: Cadence, mut job: F) -> SchedulerHandle
where
    F: FnMut() + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    info!("scheduler started: {}", cadence);

    let join = thread::Builder::new()
        .name("valuetrack-scheduler".into())
        .spawn(move || loop {
            let next = cadence.next_run_after(&Local::now());
            debug!("next ingest at {}", next.format("%Y-%m-%d %H:%M:%S"));
            loop {
                let now = Local::now();
                if now >= next {
                    break;
                }
                let wait = (next.clone() - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(MAX_SLICE);
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("scheduler stopped");
                        return;
                    }
                }
            }
            job();
        });

    match join {
        Ok(j) => SchedulerHandle {
            stop_tx: Some(stop_tx),
            join: Some(j),
        },
        Err(e) => {
            log::error!("cannot spawn scheduler thread: {}", e);
            SchedulerHandle {
                stop_tx: None,
                join: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn next_run_is_today_when_still_ahead() {
        let d = DailySchedule::new(3, 30).unwrap();
        let next = d.next_run_after(&utc("2025-06-10T01:00:00Z"));
        assert_eq!(next, utc("2025-06-10T03:30:00Z"));
    }

    #[test]
    fn next_run_rolls_to_tomorrow() {
        let d = DailySchedule::new(3, 30).unwrap();
        assert_eq!(
            d.next_run_after(&utc("2025-06-10T03:30:00Z")),
            utc("2025-06-11T03:30:00Z")
        );
        assert_eq!(
            d.next_run_after(&utc("2025-12-31T22:00:00Z")),
            utc("2026-01-01T03:30:00Z")
        );
    }

    #[test]
    fn rejects_out_of_range_time() {
        assert!(DailySchedule::new(24, 0).is_none());
        assert!(DailySchedule::new(5, 60).is_none());
    }

    #[test]
    fn random_schedule_stays_in_window() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let d = DailySchedule::random(1..=5, &mut rng);
            let h = chrono::Timelike::hour(&d.time());
            assert!((1..=5).contains(&h), "hour {h} outside window");
        }
        let d = DailySchedule::random(30..=40, &mut rng);
        assert_eq!(chrono::Timelike::hour(&d.time()), 23);
    }

    #[test]
    fn interval_cadence_adds_interval() {
        let now = Local::now();
        let next = Cadence::Every(Duration::from_secs(90)).next_run_after(&now);
        assert_eq!((next - now).num_seconds(), 90);
    }
}
