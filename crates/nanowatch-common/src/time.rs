//! Monotonic time sources.
//!
//! The timer table reads time through the [`Clock`] trait so that the same
//! code runs against the real monotonic clock in production and a manually
//! advanced clock in tests and simulations.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic, non-decreasing nanosecond time source.
///
/// Readings are only meaningful relative to each other. A clock that goes
/// backwards corrupts slot placement and sweep ordering.
pub trait Clock {
    /// Current time in nanoseconds.
    fn now_ns(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ns(&self) -> i64 {
        (**self).now_ns()
    }
}

/// Wall-clock-independent monotonic clock backed by [`Instant`].
///
/// Readings are nanoseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Time elapsed since the clock's epoch.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ns(&self) -> i64 {
        duration_to_ns(self.epoch.elapsed())
    }
}

/// Manually advanced clock.
///
/// Clones share the same underlying time, so a test can hand one clone to a
/// stopwatch and keep another to drive time forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock reading `start_ns`.
    #[must_use]
    pub fn new(start_ns: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ns)),
        }
    }

    /// Move the clock to an absolute time.
    ///
    /// Moving backwards trips a debug assertion and is otherwise ignored.
    pub fn set(&self, ns: i64) {
        let prev = self.now.fetch_max(ns, Ordering::AcqRel);
        debug_assert!(ns >= prev, "ManualClock moved backwards: {prev} -> {ns}");
    }

    /// Advance the clock by `delta_ns` (saturating).
    pub fn advance(&self, delta_ns: i64) {
        let delta = delta_ns.max(0);
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(delta))
            });
    }

    /// Advance the clock by a [`Duration`].
    pub fn advance_by(&self, duration: Duration) {
        self.advance(duration_to_ns(duration));
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_ns(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}

/// Convert a [`Duration`] to signed nanoseconds, saturating at `i64::MAX`.
#[must_use]
pub fn duration_to_ns(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}
