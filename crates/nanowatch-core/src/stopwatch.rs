//! Fixed-capacity approximate timer table.
//!
//! Timers live in a flat array of slots. A timer is hashed to the slot of its
//! *canonical bucket*, `floor(stop_time / resolution) mod capacity`, and
//! linear probing moves it forward to the first free slot. A cursor walks the
//! buckets as time passes; each [`Stopwatch::tick`] visits only the buckets
//! whose time has come since the previous tick, so the cost of a tick depends
//! on elapsed time rather than on capacity.
//!
//! ```text
//!   slot:      0        1        2        3
//!          +--------+--------+--------+--------+
//!   active |   -    |  T(a)  |  T(b)  |   -    |
//!          +--------+--------+--------+--------+
//!                       ^        ^
//!                       |        +-- b collided with a at bucket 1, probed to 2
//!                       +----------- cursor (next bucket to sweep)
//! ```
//!
//! Detection is approximate: a timer is never reported before its stop time,
//! but may be reported up to one resolution late, longer if a collision
//! displaced it past the cursor, and longer still if `tick` is called late.
//! A timer whose stop time falls in a bucket the cursor has already swept
//! (a short timer started just after a tick) waits for the cursor to come
//! round again, up to a full lap of `capacity` buckets.

use crate::handle::TimerHandle;
use nanowatch_common::config::StopwatchConfig;
use nanowatch_common::error::{StopwatchError, StopwatchResult};
use nanowatch_common::time::{duration_to_ns, Clock, MonotonicClock};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, trace};

/// One timer slot.
#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    active: bool,
    /// Bumped each time the slot is claimed by `start`.
    generation: u32,
    start_time: i64,
    stop_time: i64,
}

/// Running counters for a [`Stopwatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Timers started.
    pub started: u64,
    /// Timers stopped explicitly.
    pub stopped: u64,
    /// Timers reported as expired by `tick`.
    pub expired: u64,
    /// Starts rejected because the table was full.
    pub overflows: u64,
    /// Calls to `tick`.
    pub ticks: u64,
    /// Buckets visited across all ticks.
    pub buckets_visited: u64,
    /// Longest forward probe taken by a single `start`.
    pub max_probe: usize,
    /// Largest `now - stop_time` observed when a timer was reported expired.
    pub max_lateness_ns: u64,
    /// Sum of lateness over all expirations (saturating).
    pub total_lateness_ns: u64,
}

impl SweepStats {
    /// Mean expiration lateness in nanoseconds.
    #[must_use]
    pub fn mean_lateness_ns(&self) -> Option<u64> {
        (self.expired > 0).then(|| self.total_lateness_ns / self.expired)
    }
}

/// Approximate, constant-space interval timer table.
///
/// Start a timer with [`start`](Self::start); the returned [`TimerHandle`]
/// is the caller's key for whatever is being timed. If the timer is not
/// [`stop`](Self::stop)ped first, a [`tick`](Self::tick) at or after its stop
/// time reports it as expired.
///
/// Call `tick` roughly once per `resolution`. Calling it less often only
/// delays detection; calling it more often costs nothing beyond the buckets
/// that have actually come due.
///
/// The table is not synchronized. Every mutating call takes `&mut self`;
/// share it across threads behind a lock of the caller's choosing.
#[derive(Debug)]
pub struct Stopwatch<C: Clock = MonotonicClock> {
    /// Nanoseconds per bucket.
    resolution: i64,
    /// Number of slots.
    capacity: usize,
    /// `capacity` as a signed modulus for bucket arithmetic.
    modulus: i64,
    slots: Box<[Slot]>,
    /// Absolute number of the next bucket not yet swept.
    cursor: i64,
    active_count: usize,
    clock: C,
    stats: SweepStats,
}

impl Stopwatch<MonotonicClock> {
    /// Create a table driven by the process monotonic clock.
    ///
    /// # Arguments
    ///
    /// * `resolution` - Nanoseconds per sweep bucket; the intended tick interval.
    /// * `capacity` - Maximum number of concurrently active timers.
    ///
    /// # Errors
    ///
    /// Returns [`StopwatchError::InvalidResolution`] or
    /// [`StopwatchError::InvalidCapacity`] if either argument is not positive.
    pub fn new(resolution: i64, capacity: usize) -> StopwatchResult<Self> {
        Self::with_clock(resolution, capacity, MonotonicClock::new())
    }

    /// Create a table from configuration, driven by the monotonic clock.
    ///
    /// # Errors
    ///
    /// Same as [`Stopwatch::new`].
    pub fn from_config(config: &StopwatchConfig) -> StopwatchResult<Self> {
        Self::from_config_with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> Stopwatch<C> {
    /// Create a table reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`StopwatchError::InvalidResolution`] or
    /// [`StopwatchError::InvalidCapacity`] if either argument is not positive.
    pub fn with_clock(resolution: i64, capacity: usize, clock: C) -> StopwatchResult<Self> {
        if resolution <= 0 {
            return Err(StopwatchError::InvalidResolution(resolution));
        }
        if capacity == 0 {
            return Err(StopwatchError::InvalidCapacity);
        }
        let modulus = i64::try_from(capacity).map_err(|_| StopwatchError::InvalidCapacity)?;

        let cursor = clock.now_ns().div_euclid(resolution);

        info!(resolution_ns = resolution, capacity, "Stopwatch created");

        Ok(Self {
            resolution,
            capacity,
            modulus,
            slots: vec![Slot::default(); capacity].into_boxed_slice(),
            cursor,
            active_count: 0,
            clock,
            stats: SweepStats::default(),
        })
    }

    /// Create a table from configuration, reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`Stopwatch::with_clock`].
    pub fn from_config_with_clock(config: &StopwatchConfig, clock: C) -> StopwatchResult<Self> {
        Self::with_clock(duration_to_ns(config.resolution), config.capacity, clock)
    }

    /// Start a timer that expires `duration` nanoseconds from now.
    ///
    /// Negative durations are accepted; such a timer is already due.
    ///
    /// # Errors
    ///
    /// Returns [`StopwatchError::Overflow`] if every slot is active. Nothing
    /// is modified in that case.
    pub fn start(&mut self, duration: i64) -> StopwatchResult<TimerHandle> {
        // Probing below only terminates if a free slot exists.
        if self.active_count == self.capacity {
            self.stats.overflows += 1;
            debug!(capacity = self.capacity, "Timer start rejected: table full");
            return Err(StopwatchError::Overflow {
                capacity: self.capacity,
            });
        }

        let start_time = self.clock.now_ns();
        let stop_time = start_time.saturating_add(duration);

        let mut index = self.slot_of(self.bucket_of(stop_time));
        let mut probe = 0;
        while self.slots[index].active {
            index = (index + 1) % self.capacity;
            probe += 1;
        }

        let slot = &mut self.slots[index];
        slot.active = true;
        slot.generation = slot.generation.wrapping_add(1);
        slot.start_time = start_time;
        slot.stop_time = stop_time;
        let handle = TimerHandle::new(index, slot.generation);

        self.active_count += 1;
        self.stats.started += 1;
        self.stats.max_probe = self.stats.max_probe.max(probe);

        Ok(handle)
    }

    /// Start a timer from a [`Duration`].
    ///
    /// # Errors
    ///
    /// Same as [`Stopwatch::start`].
    pub fn start_after(&mut self, duration: Duration) -> StopwatchResult<TimerHandle> {
        self.start(duration_to_ns(duration))
    }

    /// Stop a live timer and return the nanoseconds elapsed since it started.
    ///
    /// The elapsed time may exceed the requested duration if `tick` was not
    /// called promptly or a collision delayed detection. That is expected;
    /// chronic lateness suggests adjusting resolution and tick cadence.
    ///
    /// # Errors
    ///
    /// - [`StopwatchError::OutOfRange`] if the handle's index is not a slot.
    /// - [`StopwatchError::Inactive`] if the timer was already stopped or
    ///   expired, or the slot now belongs to a later timer.
    pub fn stop(&mut self, handle: TimerHandle) -> StopwatchResult<i64> {
        let index = self.live_index(handle).inspect_err(|e| {
            debug!(timer = %handle, error = %e, "Timer stop rejected");
        })?;

        let slot = &mut self.slots[index];
        slot.active = false;
        let start_time = slot.start_time;

        self.active_count -= 1;
        self.stats.stopped += 1;

        Ok(self.clock.now_ns().saturating_sub(start_time))
    }

    /// Deactivate and report every timer that has expired since the last tick.
    ///
    /// Expired handles are written to `expired[..n]` and `n` is returned. No
    /// allocation happens here: size the buffer once with
    /// [`expiry_buffer`](Self::expiry_buffer). If a smaller buffer fills up,
    /// the sweep stops at the current bucket and the next tick resumes there,
    /// so no expiration is lost.
    pub fn tick(&mut self, expired: &mut [TimerHandle]) -> usize {
        let now = self.clock.now_ns();
        let end = self.bucket_of(now).saturating_add(1);

        // A full lap covers every slot; more would revisit them.
        let due = end.saturating_sub(self.cursor).clamp(0, self.modulus);

        let mut count = 0;
        let mut visited: u64 = 0;
        let mut complete = true;

        for _ in 0..due {
            let index = self.slot_of(self.cursor);
            let slot = &mut self.slots[index];

            if slot.active && slot.stop_time <= now {
                if count == expired.len() {
                    complete = false;
                    break;
                }
                slot.active = false;
                expired[count] = TimerHandle::new(index, slot.generation);
                count += 1;

                let lateness = u64::try_from(now.saturating_sub(slot.stop_time)).unwrap_or(0);
                self.active_count -= 1;
                self.stats.max_lateness_ns = self.stats.max_lateness_ns.max(lateness);
                self.stats.total_lateness_ns = self.stats.total_lateness_ns.saturating_add(lateness);
            }

            self.cursor += 1;
            visited += 1;
        }

        if complete {
            self.cursor = self.cursor.max(end);
        }

        self.stats.ticks += 1;
        self.stats.buckets_visited += visited;
        self.stats.expired += count as u64;

        if count > 0 {
            trace!(
                expired = count,
                buckets = visited,
                active = self.active_count,
                "Tick swept expired timers"
            );
        }

        count
    }

    /// A buffer large enough for any single [`tick`](Self::tick).
    #[must_use]
    pub fn expiry_buffer(&self) -> Vec<TimerHandle> {
        vec![TimerHandle::default(); self.capacity]
    }

    /// Whether `handle` refers to a live timer.
    #[must_use]
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.live_index(handle).is_ok()
    }

    /// Stop time of a live timer, in clock nanoseconds.
    #[must_use]
    pub fn deadline(&self, handle: TimerHandle) -> Option<i64> {
        self.live_index(handle)
            .ok()
            .map(|index| self.slots[index].stop_time)
    }

    /// Nanoseconds until a live timer is due; negative once it is overdue.
    #[must_use]
    pub fn remaining(&self, handle: TimerHandle) -> Option<i64> {
        self.deadline(handle)
            .map(|deadline| deadline.saturating_sub(self.clock.now_ns()))
    }

    /// Handles of all live timers, in slot order.
    pub fn active_timers(&self) -> impl Iterator<Item = TimerHandle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| TimerHandle::new(index, slot.generation))
    }

    /// Nanoseconds per sweep bucket.
    #[must_use]
    pub fn resolution(&self) -> i64 {
        self.resolution
    }

    /// Maximum number of concurrently active timers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live timers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Whether another `start` would overflow.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.active_count == self.capacity
    }

    /// Whether no timer is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    /// Slot index of the next bucket to be swept.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.slot_of(self.cursor)
    }

    /// Running counters.
    #[must_use]
    pub fn stats(&self) -> &SweepStats {
        &self.stats
    }

    /// The clock this table reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn live_index(&self, handle: TimerHandle) -> StopwatchResult<usize> {
        let index = handle.index();
        let slot = self.slots.get(index).ok_or(StopwatchError::OutOfRange {
            index,
            capacity: self.capacity,
        })?;
        if !slot.active || slot.generation != handle.generation() {
            return Err(StopwatchError::Inactive { index });
        }
        Ok(index)
    }

    #[inline]
    fn bucket_of(&self, time: i64) -> i64 {
        time.div_euclid(self.resolution)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn slot_of(&self, bucket: i64) -> usize {
        // rem_euclid lands in [0, capacity)
        bucket.rem_euclid(self.modulus) as usize
    }
}
