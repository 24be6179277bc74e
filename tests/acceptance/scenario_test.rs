//! Fixed-timeline acceptance scenarios.
//!
//! # Acceptance Criteria
//!
//! - A timer is reported by the first tick at or after its stop time that
//!   sweeps its slot, and never before
//! - A full table rejects further starts without side effects
//! - A stopped timer is never reported by a later tick

use super::common::{assert_invariants, manual_table, tick};
use nanowatch_common::error::StopwatchError;
use nanowatch_core::TimerHandle;

#[test]
fn scenario_a_single_timer_expires_after_due() {
    let (mut sw, clock) = manual_table(100, 4);

    let h = sw.start(250).unwrap();
    assert!(h.index() < 4);

    clock.set(50);
    assert!(tick(&mut sw).is_empty());

    clock.set(260);
    let expired = tick(&mut sw);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].index(), h.index());
    assert_eq!(sw.active_count(), 0);
    assert_invariants(&sw);
}

#[test]
fn scenario_b_third_start_overflows() {
    let (mut sw, _clock) = manual_table(100, 2);

    let a = sw.start(100).unwrap();
    let b = sw.start(100).unwrap();
    assert_ne!(a.index(), b.index());

    assert_eq!(
        sw.start(100).unwrap_err(),
        StopwatchError::Overflow { capacity: 2 }
    );
    assert!(sw.is_active(a));
    assert!(sw.is_active(b));
    assert_invariants(&sw);
}

#[test]
fn scenario_c_start_then_stop() {
    let (mut sw, clock) = manual_table(100, 4);

    let h = sw.start(300).unwrap();
    let elapsed = sw.stop(h).unwrap();
    assert_eq!(elapsed, 0);

    for t in (0..=1_200).step_by(50) {
        clock.set(t);
        assert!(tick(&mut sw).iter().all(|e| e.index() != h.index()));
    }
    assert_invariants(&sw);
}

#[test]
fn stop_after_expiry_is_inactive() {
    let (mut sw, clock) = manual_table(100, 4);

    let h = sw.start(100).unwrap();
    clock.set(200);
    assert_eq!(tick(&mut sw), vec![h]);

    assert_eq!(
        sw.stop(h).unwrap_err(),
        StopwatchError::Inactive { index: h.index() }
    );
}

#[test]
fn slot_reuse_rejects_previous_handle() {
    let (mut sw, clock) = manual_table(100, 1);

    let first = sw.start(50).unwrap();
    clock.set(100);
    assert_eq!(tick(&mut sw), vec![first]);

    clock.set(120);
    let second = sw.start(10).unwrap();
    assert_eq!(first.index(), second.index());

    // The expired handle must not cancel the new timer
    assert!(matches!(
        sw.stop(first),
        Err(StopwatchError::Inactive { .. })
    ));
    assert!(sw.is_active(second));
    assert!(sw.stop(second).is_ok());
}

#[test]
fn out_of_range_handle_rejected() {
    let (mut sw, _clock) = manual_table(100, 4);
    assert_eq!(
        sw.stop(TimerHandle::new(17, 1)).unwrap_err(),
        StopwatchError::OutOfRange {
            index: 17,
            capacity: 4
        }
    );
}

#[test]
fn repeated_tick_without_time_is_idle() {
    let (mut sw, clock) = manual_table(100, 8);

    for d in [100, 200, 300] {
        sw.start(d).unwrap();
    }
    clock.set(250);
    assert_eq!(tick(&mut sw).len(), 2);

    let visited = sw.stats().buckets_visited;
    let cursor = sw.cursor();
    assert!(tick(&mut sw).is_empty());
    assert_eq!(sw.stats().buckets_visited, visited);
    assert_eq!(sw.cursor(), cursor);
}

#[test]
fn table_refills_after_drain() {
    let (mut sw, clock) = manual_table(100, 3);

    for _ in 0..3 {
        sw.start(100).unwrap();
    }
    assert!(sw.is_full());

    clock.set(1_000);
    assert_eq!(tick(&mut sw).len(), 3);
    assert!(sw.is_empty());

    for _ in 0..3 {
        sw.start(100).unwrap();
    }
    assert!(sw.is_full());
    assert_invariants(&sw);
}
