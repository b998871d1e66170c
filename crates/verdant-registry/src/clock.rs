//! Logical time sources.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use verdant_core::LogicalTime;

/// Supplies the logical time stamped on writes.
///
/// Readings must never decrease.
pub trait LogicalClock: Send + Sync {
    /// Current logical time.
    fn now(&self) -> LogicalTime;
}

/// Unix seconds from the system clock, clamped so it never goes backwards.
#[derive(Debug, Default)]
pub struct WallClock {
    last: AtomicU64,
}

impl WallClock {
    /// Create a wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogicalClock for WallClock {
    fn now(&self) -> LogicalTime {
        let secs = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let prev = self.last.fetch_max(secs, Ordering::AcqRel);
        LogicalTime(prev.max(secs))
    }
}

/// A clock advanced explicitly by its owner, e.g. from block height.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Start at `start`.
    #[must_use]
    pub fn starting_at(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Advance by `ticks`, saturating at `u64::MAX`.
    pub fn advance(&self, ticks: u64) {
        // fetch_update only fails when the closure returns None
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(ticks))
            });
    }

    /// Jump to `value` unless that would move time backwards.
    pub fn set(&self, value: u64) {
        self.now.fetch_max(value, Ordering::AcqRel);
    }
}

impl LogicalClock for ManualClock {
    fn now(&self) -> LogicalTime {
        LogicalTime(self.now.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_monotonic() {
        let clock = WallClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a.get() > 0);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::starting_at(10);
        assert_eq!(clock.now(), LogicalTime(10));
        clock.advance(5);
        assert_eq!(clock.now(), LogicalTime(15));
        clock.set(3);
        assert_eq!(clock.now(), LogicalTime(15));
        clock.set(40);
        assert_eq!(clock.now(), LogicalTime(40));
        clock.set(u64::MAX);
        clock.advance(1);
        assert_eq!(clock.now(), LogicalTime(u64::MAX));
    }
}
