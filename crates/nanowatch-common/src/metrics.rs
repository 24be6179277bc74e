//! Latency histogram for timer lateness monitoring.
//!
//! Provides a ring buffer-based histogram for tracking how late timers are
//! detected, without heap allocations while recording.

use std::time::Duration;

/// Latency samples with ring buffer for percentile reporting.
#[derive(Debug)]
pub struct LatencyHistogram {
    /// Ring buffer of samples in nanoseconds.
    samples: Box<[u64]>,
    /// Current write position in the ring buffer.
    write_pos: usize,
    /// Number of samples retained (saturates at buffer size).
    sample_count: usize,
    /// Total samples recorded.
    total: u64,
    /// Minimum observed sample in nanoseconds.
    min_ns: u64,
    /// Maximum observed sample in nanoseconds.
    max_ns: u64,
    /// Sum of all samples for mean calculation.
    sum_ns: u64,
    /// Number of samples above the threshold.
    over_threshold: u64,
    /// Samples strictly above this many nanoseconds are counted as excessive.
    threshold_ns: u64,
}

impl LatencyHistogram {
    /// Create a new histogram.
    ///
    /// # Arguments
    ///
    /// * `histogram_size` - Number of samples to retain in the ring buffer.
    /// * `threshold` - Samples exceeding this are counted by [`Self::over_threshold_count`].
    #[must_use]
    pub fn new(histogram_size: usize, threshold: Duration) -> Self {
        let size = histogram_size.max(1);
        Self {
            samples: vec![0u64; size].into_boxed_slice(),
            write_pos: 0,
            sample_count: 0,
            total: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            sum_ns: 0,
            over_threshold: 0,
            threshold_ns: u64::try_from(threshold.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    /// Record a sample.
    pub fn record(&mut self, duration: Duration) {
        self.record_ns(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
    }

    /// Record a sample in nanoseconds directly.
    pub fn record_ns(&mut self, ns: u64) {
        self.samples[self.write_pos] = ns;
        self.write_pos = (self.write_pos + 1) % self.samples.len();
        self.sample_count = self.sample_count.saturating_add(1).min(self.samples.len());

        self.total += 1;
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.sum_ns = self.sum_ns.wrapping_add(ns);

        if ns > self.threshold_ns {
            self.over_threshold += 1;
        }
    }

    /// Record a signed nanosecond sample, clamping negatives to zero.
    pub fn record_signed_ns(&mut self, ns: i64) {
        self.record_ns(u64::try_from(ns).unwrap_or(0));
    }

    /// Total number of samples recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Minimum observed sample.
    #[must_use]
    pub fn min(&self) -> Option<Duration> {
        (self.total > 0).then(|| Duration::from_nanos(self.min_ns))
    }

    /// Maximum observed sample.
    #[must_use]
    pub fn max(&self) -> Option<Duration> {
        (self.total > 0).then(|| Duration::from_nanos(self.max_ns))
    }

    /// Mean of all samples.
    #[must_use]
    pub fn mean(&self) -> Option<Duration> {
        (self.total > 0).then(|| Duration::from_nanos(self.sum_ns / self.total))
    }

    /// Number of samples above the threshold.
    #[must_use]
    pub fn over_threshold_count(&self) -> u64 {
        self.over_threshold
    }

    /// Compute a percentile from the ring buffer.
    ///
    /// Returns `None` if no samples have been collected or if `percentile`
    /// is outside `0.0..=100.0`.
    #[must_use]
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.sample_count == 0 || !is_valid_percentile(percentile) {
            return None;
        }

        let sorted = self.sorted_samples();
        Some(Duration::from_nanos(sorted[rank(percentile, sorted.len())]))
    }

    /// Compute multiple percentiles with a single sort.
    ///
    /// Invalid percentiles (< 0, > 100, or NaN) are skipped.
    #[must_use]
    pub fn percentiles(&self, percentiles: &[f64]) -> Vec<(f64, Duration)> {
        if self.sample_count == 0 {
            return vec![];
        }

        let sorted = self.sorted_samples();
        percentiles
            .iter()
            .copied()
            .filter(|&p| is_valid_percentile(p))
            .map(|p| (p, Duration::from_nanos(sorted[rank(p, sorted.len())])))
            .collect()
    }

    /// Get a snapshot of current statistics.
    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        let has_samples = self.total > 0;
        HistogramSnapshot {
            total: self.total,
            min_ns: has_samples.then_some(self.min_ns),
            max_ns: has_samples.then_some(self.max_ns),
            mean_ns: has_samples.then(|| self.sum_ns / self.total),
            over_threshold: self.over_threshold,
            sample_count: self.sample_count,
        }
    }

    fn sorted_samples(&self) -> Vec<u64> {
        let mut sorted = self.samples[..self.sample_count].to_vec();
        sorted.sort_unstable();
        sorted
    }
}

fn is_valid_percentile(p: f64) -> bool {
    (0.0..=100.0).contains(&p)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn rank(percentile: f64, len: usize) -> usize {
    let idx = ((percentile / 100.0) * (len - 1) as f64).round() as usize;
    idx.min(len - 1)
}

/// Immutable snapshot of histogram statistics for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct HistogramSnapshot {
    /// Total samples recorded.
    pub total: u64,
    /// Minimum sample in nanoseconds.
    pub min_ns: Option<u64>,
    /// Maximum sample in nanoseconds.
    pub max_ns: Option<u64>,
    /// Mean sample in nanoseconds.
    pub mean_ns: Option<u64>,
    /// Number of samples above the threshold.
    pub over_threshold: u64,
    /// Number of samples retained in the ring buffer.
    pub sample_count: usize,
}
