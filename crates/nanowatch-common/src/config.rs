//! Configuration structures for the timer table and the workload driver.
//!
//! Supports TOML deserialization with defaults suitable for local runs.
//! Durations are written in humantime format (`"1ms"`, `"250us"`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NanowatchConfig {
    /// Timer table geometry.
    pub stopwatch: StopwatchConfig,

    /// Synthetic workload used by the CLI driver.
    pub workload: WorkloadConfig,

    /// Latency histogram configuration.
    pub metrics: MetricsConfig,
}

/// Timer table geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopwatchConfig {
    /// Width of one sweep bucket; also the intended tick interval.
    #[serde(with = "humantime_serde")]
    pub resolution: Duration,

    /// Maximum number of concurrently active timers.
    pub capacity: usize,
}

impl Default for StopwatchConfig {
    fn default() -> Self {
        Self {
            resolution: Duration::from_millis(1),
            capacity: 1024,
        }
    }
}

/// Synthetic workload parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Timers started before each tick.
    pub timers_per_tick: usize,

    /// Shortest requested timer duration.
    #[serde(with = "humantime_serde")]
    pub min_duration: Duration,

    /// Longest requested timer duration.
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,

    /// Every n-th started timer is stopped explicitly before it expires
    /// (0 disables explicit stops).
    pub stop_every: usize,

    /// Number of ticks to run.
    pub ticks: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            timers_per_tick: 8,
            min_duration: Duration::from_millis(5),
            max_duration: Duration::from_millis(50),
            stop_every: 3,
            ticks: 200,
        }
    }
}

/// Latency histogram configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Size of each latency histogram ring buffer.
    pub histogram_size: usize,

    /// Percentiles to report (e.g., [50, 90, 99]).
    pub percentiles: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            histogram_size: 10_000,
            percentiles: vec![50.0, 90.0, 99.0],
        }
    }
}

impl NanowatchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the values are inconsistent.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stopwatch.resolution.is_zero() {
            return Err(ConfigError::Invalid(
                "stopwatch.resolution must be greater than zero".into(),
            ));
        }
        if i64::try_from(self.stopwatch.resolution.as_nanos()).is_err() {
            return Err(ConfigError::Invalid(
                "stopwatch.resolution does not fit in i64 nanoseconds".into(),
            ));
        }
        if self.stopwatch.capacity == 0 {
            return Err(ConfigError::Invalid(
                "stopwatch.capacity must be greater than zero".into(),
            ));
        }
        if self.workload.min_duration > self.workload.max_duration {
            return Err(ConfigError::Invalid(format!(
                "workload.min_duration ({}) exceeds workload.max_duration ({})",
                humantime::format_duration(self.workload.min_duration),
                humantime::format_duration(self.workload.max_duration),
            )));
        }
        if self.metrics.histogram_size == 0 {
            return Err(ConfigError::Invalid(
                "metrics.histogram_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values parsed but are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
