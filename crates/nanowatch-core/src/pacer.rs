//! Tick cadence helper for the caller's loop.
//!
//! A [`Stopwatch`](crate::Stopwatch) never blocks; the owner decides when to
//! call `tick`. `TickPacer` keeps an absolute deadline that advances by one
//! period per tick (`deadline + period`, not `now + period`), so sleep
//! overshoot does not accumulate into drift. When the loop falls more than a
//! period behind, the missed periods are skipped rather than replayed.

use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Outcome of one paced wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerTick {
    /// Sequence number of this tick, starting at 1.
    pub tick: u64,
    /// Whole periods skipped because the loop fell behind.
    pub missed: u64,
    /// How far past its deadline this tick was released.
    pub lag: Duration,
}

/// Absolute-deadline pacer.
#[derive(Debug, Clone)]
pub struct TickPacer {
    period: Duration,
    next_deadline: Option<Instant>,
    ticks: u64,
    missed: u64,
}

impl TickPacer {
    /// Create a pacer with the given period (clamped to at least 1ns).
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_nanos(1)),
            next_deadline: None,
            ticks: 0,
            missed: 0,
        }
    }

    /// Create a pacer matching a stopwatch resolution in nanoseconds.
    #[must_use]
    pub fn from_resolution_ns(resolution: i64) -> Self {
        Self::new(Duration::from_nanos(u64::try_from(resolution).unwrap_or(1)))
    }

    /// Period between ticks.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks released so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Total periods skipped.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Anchor the first deadline one period after `now`.
    pub fn start_at(&mut self, now: Instant) {
        self.next_deadline = Some(now + self.period);
    }

    /// Block the current thread until the next deadline.
    pub fn wait(&mut self) -> PacerTick {
        let (sleep, tick) = self.schedule(Instant::now());
        if !sleep.is_zero() {
            std::thread::sleep(sleep);
        }
        tick
    }

    /// Compute how long to sleep from `now` and advance the deadline.
    ///
    /// The first call anchors the schedule at `now + period`.
    pub fn schedule(&mut self, now: Instant) -> (Duration, PacerTick) {
        let deadline = *self.next_deadline.get_or_insert(now + self.period);

        let (sleep, lag, missed) = if deadline > now {
            (deadline - now, Duration::ZERO, 0)
        } else {
            let lag = now - deadline;
            let missed = u64::try_from(lag.as_nanos() / self.period.as_nanos()).unwrap_or(u64::MAX);
            (Duration::ZERO, lag, missed)
        };

        if missed > 0 {
            warn!(
                missed,
                lag_us = lag.as_micros(),
                period_us = self.period.as_micros(),
                "Tick loop fell behind, skipping periods"
            );
        }

        let skip = u32::try_from(missed.saturating_add(1)).unwrap_or(u32::MAX);
        self.next_deadline = Some(deadline + self.period.saturating_mul(skip));
        self.ticks += 1;
        self.missed = self.missed.saturating_add(missed);

        trace!(tick = self.ticks, sleep_us = sleep.as_micros(), "Pacer scheduled");

        (
            sleep,
            PacerTick {
                tick: self.ticks,
                missed,
                lag,
            },
        )
    }
}
