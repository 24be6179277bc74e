//! Synthetic workload driver.
//!
//! Each iteration stops the timers picked for early cancellation on the
//! previous iteration, starts a batch of new timers, waits one period, and
//! sweeps the table. The driver keeps its own slot-indexed table of
//! deadlines so it can measure how late each expiration was detected.

use nanowatch_common::config::NanowatchConfig;
use nanowatch_common::error::{StopwatchError, StopwatchResult};
use nanowatch_common::metrics::{HistogramSnapshot, LatencyHistogram};
use nanowatch_common::time::{duration_to_ns, Clock};
use nanowatch_core::{Stopwatch, SweepStats, TimerHandle};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Summary of a workload run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    /// Ticks executed.
    pub ticks: u64,
    /// Explicit stops that found the timer already expired.
    pub stale_stops: u64,
    /// Timers still live when the run ended.
    pub still_active: usize,
    /// Counters kept by the table itself.
    pub stats: SweepStats,
    /// Detection lateness (`now - deadline`) of expired timers.
    pub lateness: HistogramSnapshot,
    /// Lateness percentiles in nanoseconds.
    pub lateness_percentiles: Vec<(f64, u64)>,
    /// Elapsed time returned by explicit stops.
    pub stop_elapsed: HistogramSnapshot,
}

/// Deterministic spread of durations over `[min, max]`.
fn duration_for(seq: u64, min: i64, max: i64) -> i64 {
    let span = u64::try_from(max.saturating_sub(min)).unwrap_or(0);
    if span == 0 {
        return min;
    }
    // Knuth multiplicative hash scatters consecutive sequence numbers
    let offset = seq.wrapping_mul(2_654_435_761) % (span + 1);
    min.saturating_add(i64::try_from(offset).unwrap_or(0))
}

/// Run the configured workload against `sw`.
///
/// `wait` is called once per iteration between starting timers and
/// sweeping; it is where the caller sleeps or advances a manual clock.
///
/// # Errors
///
/// Propagates any table error other than the expected `Overflow` on start
/// and `Inactive` on a stop that lost the race with expiry.
pub fn run<C: Clock>(
    sw: &mut Stopwatch<C>,
    config: &NanowatchConfig,
    mut wait: impl FnMut(),
) -> StopwatchResult<WorkloadReport> {
    let workload = &config.workload;
    let min = duration_to_ns(workload.min_duration);
    let max = duration_to_ns(workload.max_duration);
    let resolution = Duration::from_nanos(u64::try_from(sw.resolution()).unwrap_or(0));

    let mut lateness = LatencyHistogram::new(config.metrics.histogram_size, resolution);
    let mut stop_elapsed =
        LatencyHistogram::new(config.metrics.histogram_size, workload.max_duration);

    let mut deadlines = vec![0i64; sw.capacity()];
    let mut expired = sw.expiry_buffer();
    let mut to_stop: Vec<TimerHandle> = Vec::with_capacity(workload.timers_per_tick);
    let mut stale_stops = 0u64;
    let mut seq = 0u64;

    info!(
        ticks = workload.ticks,
        timers_per_tick = workload.timers_per_tick,
        capacity = sw.capacity(),
        resolution_ns = sw.resolution(),
        "Starting workload"
    );

    for _ in 0..workload.ticks {
        for handle in to_stop.drain(..) {
            match sw.stop(handle) {
                Ok(elapsed) => stop_elapsed.record_signed_ns(elapsed),
                Err(StopwatchError::Inactive { .. }) => stale_stops += 1,
                Err(e) => return Err(e),
            }
        }

        for _ in 0..workload.timers_per_tick {
            seq += 1;
            match sw.start(duration_for(seq, min, max)) {
                Ok(handle) => {
                    deadlines[handle.index()] = sw.deadline(handle).unwrap_or_default();
                    if workload.stop_every > 0 && seq % workload.stop_every as u64 == 0 {
                        to_stop.push(handle);
                    }
                }
                Err(StopwatchError::Overflow { capacity }) => {
                    debug!(seq, capacity, "Workload start overflowed");
                }
                Err(e) => return Err(e),
            }
        }

        wait();

        let n = sw.tick(&mut expired);
        let now = sw.clock().now_ns();
        for handle in &expired[..n] {
            lateness.record_signed_ns(now.saturating_sub(deadlines[handle.index()]));
        }
    }

    let lateness_percentiles = lateness
        .percentiles(&config.metrics.percentiles)
        .into_iter()
        .map(|(p, d)| (p, u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)))
        .collect();

    Ok(WorkloadReport {
        ticks: workload.ticks,
        stale_stops,
        still_active: sw.active_count(),
        stats: *sw.stats(),
        lateness: lateness.snapshot(),
        lateness_percentiles,
        stop_elapsed: stop_elapsed.snapshot(),
    })
}
