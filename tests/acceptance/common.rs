//! Common utilities for acceptance tests.

#![allow(dead_code)] // Not every helper is used by every test module

use nanowatch_common::time::{Clock, ManualClock};
use nanowatch_core::{Stopwatch, TimerHandle};

/// A table on a manual clock starting at `t = 0`.
pub fn manual_table(resolution: i64, capacity: usize) -> (Stopwatch<ManualClock>, ManualClock) {
    let clock = ManualClock::new(0);
    let sw = Stopwatch::with_clock(resolution, capacity, clock.clone())
        .expect("valid table geometry");
    (sw, clock)
}

/// Run one tick and collect the reported handles.
pub fn tick<C: Clock>(sw: &mut Stopwatch<C>) -> Vec<TimerHandle> {
    let mut buf = sw.expiry_buffer();
    let n = sw.tick(&mut buf);
    buf.truncate(n);
    buf
}

/// Check the active-count invariant against the slot array.
pub fn assert_invariants<C: Clock>(sw: &Stopwatch<C>) {
    let live = sw.active_timers().count();
    assert_eq!(live, sw.active_count(), "active count drifted from slots");
    assert!(sw.active_count() <= sw.capacity());
    assert!(sw.cursor() < sw.capacity());
}
