// THEORY:
// Frames carry their own timestamps, but queries (reports, snapshots, trend
// windows) need a notion of "now". The engine asks an injected `Clock` for it
// instead of reading the wall clock directly. Production code uses
// `SystemClock`; tests and replays use `ManualClock`, which only moves when it
// is told to, making every windowed query reproducible.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of the current time for windowed queries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that is set and advanced by hand. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Seconds elapsed from `earlier` to `later`, with millisecond precision.
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// A fractional number of seconds as a `Duration`, rounded to milliseconds.
pub fn duration_from_secs(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// The instant `secs` before `now`. A window reaching past the representable
/// range starts at the earliest instant, or at the latest one if it is negative.
pub fn window_start(now: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    Duration::try_milliseconds((secs * 1000.0).round() as i64)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(if secs > 0.0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();
        clock.advance(Duration::seconds(90));
        assert_eq!(shared.now(), start + Duration::seconds(90));
    }

    #[test]
    fn seconds_between_keeps_fractions() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = start + Duration::milliseconds(300);
        assert!((seconds_between(start, later) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn fractional_durations_round_to_millis() {
        assert_eq!(duration_from_secs(0.3), Duration::milliseconds(300));
        assert_eq!(duration_from_secs(1.5 * 3600.0), Duration::minutes(90));
    }

    #[test]
    fn window_start_saturates_instead_of_overflowing() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(window_start(now, 90.0), now - Duration::seconds(90));
        assert_eq!(window_start(now, 1e10 * 3600.0), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(now, f64::INFINITY), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(now, f64::NEG_INFINITY), DateTime::<Utc>::MAX_UTC);
    }
}
