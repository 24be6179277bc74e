//! Model-checked properties of the timer table.
//!
//! Random sequences of start / stop / advance-and-tick are replayed against
//! both the table and a plain map of live timers; the two must agree.

use super::common::{assert_invariants, manual_table, tick};
use nanowatch_common::error::StopwatchError;
use nanowatch_common::time::Clock;
use nanowatch_core::TimerHandle;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
enum Op {
    Start(i64),
    Stop(usize),
    Advance(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (-50i64..2_000).prop_map(Op::Start),
        2 => any::<usize>().prop_map(Op::Stop),
        3 => (0i64..400).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn table_agrees_with_model(
        resolution in 1i64..200,
        capacity in 1usize..16,
        ops in prop::collection::vec(op(), 1..200),
    ) {
        let (mut sw, clock) = manual_table(resolution, capacity);
        // handle -> (start time, deadline)
        let mut live: HashMap<TimerHandle, (i64, i64)> = HashMap::new();
        let mut issued: Vec<TimerHandle> = Vec::new();
        let mut max_deadline = 0i64;

        for op in ops {
            match op {
                Op::Start(duration) => {
                    let now = clock.now_ns();
                    match sw.start(duration) {
                        Ok(h) => {
                            prop_assert!(live.len() < capacity);
                            prop_assert!(h.index() < capacity);
                            prop_assert!(!live.contains_key(&h));
                            live.insert(h, (now, now + duration));
                            issued.push(h);
                            max_deadline = max_deadline.max(now + duration);
                        }
                        Err(e) => {
                            prop_assert_eq!(e, StopwatchError::Overflow { capacity });
                            prop_assert_eq!(live.len(), capacity);
                        }
                    }
                }
                Op::Stop(pick) => {
                    if issued.is_empty() {
                        continue;
                    }
                    let h = issued[pick % issued.len()];
                    match live.remove(&h) {
                        Some((start, _)) => {
                            let elapsed = sw.stop(h);
                            prop_assert_eq!(elapsed, Ok(clock.now_ns() - start));
                        }
                        None => {
                            prop_assert_eq!(
                                sw.stop(h),
                                Err(StopwatchError::Inactive { index: h.index() })
                            );
                        }
                    }
                }
                Op::Advance(dt) => {
                    clock.advance(dt);
                    let now = clock.now_ns();
                    let expired = tick(&mut sw);

                    let mut seen = HashSet::new();
                    for h in expired {
                        prop_assert!(seen.insert(h), "reported twice: {}", h);
                        let (_, deadline) = live.remove(&h).ok_or_else(|| {
                            TestCaseError::fail(format!("reported a timer that was not live: {h}"))
                        })?;
                        prop_assert!(deadline <= now, "reported early: {} due {} at {}", h, deadline, now);
                    }
                }
            }

            prop_assert_eq!(sw.active_count(), live.len());
            assert_invariants(&sw);
        }

        // One lap after every deadline has passed reports everything left
        clock.set(max_deadline.max(clock.now_ns()) + resolution * capacity as i64 + 1);
        let expired: HashSet<_> = tick(&mut sw).into_iter().collect();
        let remaining: HashSet<_> = live.keys().copied().collect();
        prop_assert_eq!(expired, remaining);
        prop_assert!(sw.is_empty());
    }

    #[test]
    fn fill_to_capacity_then_overflow(
        capacity in 1usize..64,
        durations in prop::collection::vec(-1_000i64..1_000_000, 64),
        extra in any::<i64>(),
    ) {
        let (mut sw, _clock) = manual_table(1_000, capacity);

        let mut indices = HashSet::new();
        for (n, &d) in durations.iter().take(capacity).enumerate() {
            let h = sw.start(d).unwrap();
            prop_assert!(indices.insert(h.index()));
            prop_assert_eq!(sw.active_count(), n + 1);
        }

        let before: Vec<_> = sw.active_timers().map(|h| sw.deadline(h)).collect();
        prop_assert_eq!(sw.start(extra), Err(StopwatchError::Overflow { capacity }));
        let after: Vec<_> = sw.active_timers().map(|h| sw.deadline(h)).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(sw.active_count(), capacity);
    }
}
