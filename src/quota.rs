//! Global hourly email-send budget.
//!
//! A single counter shared by every request. A window opens at the first
//! consumption and lasts one hour; once more than an hour has passed, the
//! next consumption resets the count and opens a new window.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local};

/// Default number of sends allowed per hour.
pub const DEFAULT_MAX_PER_HOUR: u32 = 50;

/// Mutable quota state. `window_start` is `None` until the first consumption.
#[derive(Debug, Clone, Copy, Default)]
struct QuotaState {
    count: u32,
    window_start: Option<DateTime<Local>>,
}

impl QuotaState {
    /// Start of the window that is still open at `now`, if any.
    fn open_window(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        self.window_start
            .filter(|&start| now - start <= HourlyQuotaCounter::window())
    }

    fn roll(&mut self, now: DateTime<Local>) {
        if self.open_window(now).is_none() {
            self.count = 0;
            self.window_start = Some(now);
        }
    }
}

/// Point-in-time view of the quota, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Sends consumed in the current window.
    pub count: u32,
    /// Sends allowed per window.
    pub max_per_hour: u32,
    /// When the current window ends. `None` if it already has, in which case
    /// the next consumption opens a new one.
    pub resets_at: Option<DateTime<Local>>,
}

impl QuotaSnapshot {
    /// Sends still available in the current window.
    pub fn remaining(&self) -> u32 {
        self.max_per_hour.saturating_sub(self.count)
    }
}

/// Rolling-hour send counter.
#[derive(Debug)]
pub struct HourlyQuotaCounter {
    max_per_hour: u32,
    state: Mutex<QuotaState>,
}

impl HourlyQuotaCounter {
    /// Create a counter allowing `max_per_hour` sends per window.
    pub fn new(max_per_hour: u32) -> Self {
        Self {
            max_per_hour,
            state: Mutex::new(QuotaState::default()),
        }
    }

    /// Length of a quota window.
    pub fn window() -> Duration {
        Duration::hours(1)
    }

    /// Sends allowed per window.
    pub fn max_per_hour(&self) -> u32 {
        self.max_per_hour
    }

    fn state(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume one unit of quota. Returns `false` if the cap is reached.
    pub fn try_consume(&self) -> bool {
        self.try_consume_at(Local::now())
    }

    /// Consume one unit of quota at `now`.
    pub fn try_consume_at(&self, now: DateTime<Local>) -> bool {
        let mut state = self.state();
        state.roll(now);

        if state.count >= self.max_per_hour {
            tracing::warn!(
                count = state.count,
                max_per_hour = self.max_per_hour,
                "Hourly email limit reached"
            );
            return false;
        }

        state.count += 1;
        true
    }

    /// Current count, cap and reset time.
    pub fn snapshot(&self) -> QuotaSnapshot {
        self.snapshot_at(Local::now())
    }

    /// Current count, cap and reset time as seen at `now`.
    pub fn snapshot_at(&self, now: DateTime<Local>) -> QuotaSnapshot {
        let state = *self.state();
        let open = state.open_window(now);

        QuotaSnapshot {
            count: if open.is_some() { state.count } else { 0 },
            max_per_hour: self.max_per_hour,
            resets_at: open.map(|start| start + Self::window()),
        }
    }
}

impl Default for HourlyQuotaCounter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_HOUR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_consumes_up_to_cap() {
        let counter = HourlyQuotaCounter::new(3);

        assert!(counter.try_consume_at(t0()));
        assert!(counter.try_consume_at(t0() + Duration::minutes(1)));
        assert!(counter.try_consume_at(t0() + Duration::minutes(2)));
        assert!(!counter.try_consume_at(t0() + Duration::minutes(3)));
        assert!(!counter.try_consume_at(t0() + Duration::minutes(59)));
    }

    #[test]
    fn test_rejection_does_not_increment() {
        let counter = HourlyQuotaCounter::new(1);

        assert!(counter.try_consume_at(t0()));
        assert!(!counter.try_consume_at(t0()));
        assert!(!counter.try_consume_at(t0()));

        assert_eq!(counter.snapshot_at(t0()).count, 1);
    }

    #[test]
    fn test_resets_after_one_hour() {
        let counter = HourlyQuotaCounter::new(2);

        assert!(counter.try_consume_at(t0()));
        assert!(counter.try_consume_at(t0()));
        assert!(!counter.try_consume_at(t0() + Duration::minutes(30)));

        // Exactly one hour is not yet "more than" an hour.
        assert!(!counter.try_consume_at(t0() + Duration::hours(1)));

        let later = t0() + Duration::hours(1) + Duration::seconds(1);
        assert!(counter.try_consume_at(later));

        let snapshot = counter.snapshot_at(later);
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.resets_at, Some(later + Duration::hours(1)));
    }

    #[test]
    fn test_default_cap() {
        let counter = HourlyQuotaCounter::new(DEFAULT_MAX_PER_HOUR);
        for _ in 0..50 {
            assert!(counter.try_consume_at(t0()));
        }
        assert!(!counter.try_consume_at(t0()));
        assert_eq!(HourlyQuotaCounter::default().max_per_hour(), 50);
    }

    #[test]
    fn test_window_opens_at_first_consumption() {
        let counter = HourlyQuotaCounter::new(1);
        let first = t0() + Duration::minutes(40);

        assert!(counter.try_consume_at(first));
        // 1h20m after t0, but only 40 minutes after the first send.
        assert!(!counter.try_consume_at(t0() + Duration::minutes(80)));
        assert!(counter.try_consume_at(first + Duration::hours(1) + Duration::seconds(1)));
    }

    #[test]
    fn test_snapshot_before_first_consumption() {
        let counter = HourlyQuotaCounter::new(10);
        let snapshot = counter.snapshot_at(t0());
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.resets_at, None);
    }

    #[test]
    fn test_snapshot_within_window() {
        let counter = HourlyQuotaCounter::new(10);
        counter.try_consume_at(t0() + Duration::minutes(5));
        counter.try_consume_at(t0() + Duration::minutes(6));

        let snapshot = counter.snapshot_at(t0() + Duration::minutes(10));
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.max_per_hour, 10);
        assert_eq!(snapshot.remaining(), 8);
        assert_eq!(
            snapshot.resets_at,
            Some(t0() + Duration::minutes(5) + Duration::hours(1))
        );
    }

    #[test]
    fn test_snapshot_after_window_lapsed() {
        let counter = HourlyQuotaCounter::new(10);
        counter.try_consume_at(t0());

        let snapshot = counter.snapshot_at(t0() + Duration::hours(2));
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.resets_at, None);
        assert_eq!(snapshot.remaining(), 10);
    }

    #[test]
    fn test_zero_cap_rejects() {
        let counter = HourlyQuotaCounter::new(0);
        assert!(!counter.try_consume_at(t0()));
    }
}
