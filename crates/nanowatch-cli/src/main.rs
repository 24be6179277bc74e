//! nanowatch entry point.
//!
//! Builds a timer table from configuration and drives a synthetic workload
//! against it, either in real time (paced by the table's resolution) or on a
//! manually advanced clock, then reports detection lateness.

mod workload;

use anyhow::{Context, Result};
use clap::Parser;
use nanowatch_common::config::NanowatchConfig;
use nanowatch_common::time::ManualClock;
use nanowatch_core::{Stopwatch, TickPacer};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::workload::WorkloadReport;

/// nanowatch command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "nanowatch",
    about = "Approximate constant-space timer table - workload driver",
    version,
    long_about = None
)]
struct Args {
    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Timers started per tick (overrides config file).
    #[arg(long, short = 't')]
    timers: Option<usize>,

    /// Number of ticks to run (overrides config file).
    #[arg(long, short = 'n')]
    ticks: Option<u64>,

    /// Advance a simulated clock one resolution per tick instead of sleeping.
    #[arg(long, short = 'm')]
    manual: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting nanowatch");

    let mut config = load_config(&args)?;

    if let Some(timers) = args.timers {
        config.workload.timers_per_tick = timers;
    }
    if let Some(ticks) = args.ticks {
        config.workload.ticks = ticks;
    }

    info!(
        resolution = %humantime::format_duration(config.stopwatch.resolution),
        capacity = config.stopwatch.capacity,
        manual = args.manual,
        "Configuration loaded"
    );

    let report = if args.manual {
        run_manual(&config)?
    } else {
        run_realtime(&config)?
    };

    print_report(&report, &config, args.json)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = log_filter(level);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .init();
}

/// Default filter directives: the binary target plus the library crates.
fn log_filter(level: &str) -> String {
    format!("nanowatch={level},nanowatch_core={level},nanowatch_common={level}")
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `NANOWATCH_CONFIG_PATH` environment variable
/// 3. `config/default.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<NanowatchConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return NanowatchConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path));
    }

    if let Ok(env_path) = std::env::var("NANOWATCH_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from NANOWATCH_CONFIG_PATH");
            return NanowatchConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from NANOWATCH_CONFIG_PATH={:?}", env_path)
            });
        }
        warn!(
            path = %env_path,
            "NANOWATCH_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/default.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return NanowatchConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {:?}", local_path));
    }

    info!("No config file found, using built-in defaults");
    Ok(NanowatchConfig::default())
}

/// Drive the workload on the monotonic clock, sleeping one resolution per tick.
fn run_realtime(config: &NanowatchConfig) -> Result<WorkloadReport> {
    let mut sw =
        Stopwatch::from_config(&config.stopwatch).context("Failed to create stopwatch")?;
    let mut pacer = TickPacer::from_resolution_ns(sw.resolution());

    let report = workload::run(&mut sw, config, || {
        pacer.wait();
    })
    .context("Workload failed")?;

    if pacer.missed() > 0 {
        warn!(missed = pacer.missed(), "Tick loop missed periods");
    }
    Ok(report)
}

/// Drive the workload on a simulated clock.
fn run_manual(config: &NanowatchConfig) -> Result<WorkloadReport> {
    let clock = ManualClock::new(0);
    let mut sw = Stopwatch::from_config_with_clock(&config.stopwatch, clock.clone())
        .context("Failed to create stopwatch")?;
    let step = config.stopwatch.resolution;

    workload::run(&mut sw, config, || clock.advance_by(step)).context("Workload failed")
}

fn print_report(report: &WorkloadReport, config: &NanowatchConfig, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{out}");
        return Ok(());
    }

    let stats = &report.stats;
    println!("nanowatch report");
    println!(
        "  table:        capacity {} @ {}",
        config.stopwatch.capacity,
        humantime::format_duration(config.stopwatch.resolution)
    );
    println!("  ticks:        {}", report.ticks);
    println!(
        "  timers:       {} started, {} stopped, {} expired, {} still active",
        stats.started, stats.stopped, stats.expired, report.still_active
    );
    println!(
        "  rejected:     {} overflows, {} stale stops",
        stats.overflows, report.stale_stops
    );
    println!(
        "  sweep:        {} buckets visited, longest probe {}",
        stats.buckets_visited, stats.max_probe
    );
    if let (Some(min), Some(max), Some(mean)) = (
        report.lateness.min_ns,
        report.lateness.max_ns,
        report.lateness.mean_ns,
    ) {
        println!("  lateness:     min {min}ns, mean {mean}ns, max {max}ns");
        for (p, ns) in &report.lateness_percentiles {
            println!("    p{p:<6}      {ns}ns");
        }
        println!(
            "  late > 1 res: {} of {}",
            report.lateness.over_threshold, report.lateness.total
        );
    }
    if let (Some(mean), Some(max)) = (report.stop_elapsed.mean_ns, report.stop_elapsed.max_ns) {
        println!("  stop elapsed: mean {mean}ns, max {max}ns");
    }
    Ok(())
}
