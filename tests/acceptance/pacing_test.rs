//! Real-time acceptance tests on the monotonic clock.
//!
//! # Acceptance Criteria
//!
//! - A paced tick loop detects a timer no earlier than its duration
//! - Detection happens within a bounded number of periods on an idle host

use std::time::{Duration, Instant};

use nanowatch_core::{Stopwatch, TickPacer};

const RESOLUTION: Duration = Duration::from_millis(2);

#[test]
fn paced_loop_detects_timer_after_duration() {
    let mut sw = Stopwatch::new(RESOLUTION.as_nanos() as i64, 16).unwrap();
    let mut pacer = TickPacer::new(RESOLUTION);
    let mut buf = sw.expiry_buffer();

    let started = Instant::now();
    let h = sw.start_after(Duration::from_millis(10)).unwrap();

    let mut detected = None;
    for _ in 0..500 {
        pacer.wait();
        let n = sw.tick(&mut buf);
        if buf[..n].contains(&h) {
            detected = Some(started.elapsed());
            break;
        }
    }

    let detected = detected.expect("timer was never reported");
    assert!(detected >= Duration::from_millis(10), "early: {detected:?}");
    // Generous bound for loaded CI hosts
    assert!(detected < Duration::from_millis(500), "late: {detected:?}");
    assert!(sw.is_empty());
}

#[test]
fn stop_reports_real_elapsed_time() {
    let mut sw = Stopwatch::new(RESOLUTION.as_nanos() as i64, 4).unwrap();

    let h = sw.start_after(Duration::from_secs(60)).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let elapsed = sw.stop(h).unwrap();

    assert!(elapsed >= 5_000_000, "elapsed {elapsed}ns");
    assert!(sw.remaining(h).is_none());
}

#[test]
fn frequent_ticks_do_not_report_early() {
    let mut sw = Stopwatch::new(RESOLUTION.as_nanos() as i64, 8).unwrap();
    let mut buf = sw.expiry_buffer();

    let h = sw.start_after(Duration::from_millis(20)).unwrap();
    let deadline = sw.deadline(h).unwrap();

    // Tick far faster than the resolution
    let until = Instant::now() + Duration::from_millis(10);
    while Instant::now() < until {
        assert_eq!(sw.tick(&mut buf), 0);
    }
    assert!(sw.is_active(h));
    assert!(deadline >= 20_000_000);
}
