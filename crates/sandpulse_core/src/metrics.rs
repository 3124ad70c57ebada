//! Tick metrics and structured logging.
//!
//! The core stays single-threaded, so counters are plain fields; output goes
//! through `tracing` and is shaped by whatever subscriber the host installs.

use sandpulse_data::SimulationStatistics;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Periodic progress reporting for the producer tick.
pub struct TickMetrics {
    ticks: u64,
    log_interval: u64,
    busiest_tick: Duration,
    start_time: Instant,
}

impl Default for TickMetrics {
    fn default() -> Self {
        Self::new(600)
    }
}

impl TickMetrics {
    /// Logs every `log_interval` ticks; 0 disables the periodic line.
    #[must_use]
    pub fn new(log_interval: u64) -> Self {
        Self {
            ticks: 0,
            log_interval,
            busiest_tick: Duration::ZERO,
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its duration.
    pub fn record_tick(&mut self, duration: Duration, stats: &SimulationStatistics) {
        self.ticks += 1;
        self.busiest_tick = self.busiest_tick.max(duration);

        if self.log_interval > 0 && self.ticks % self.log_interval == 0 {
            tracing::info!(
                tick = self.ticks,
                total_sand = stats.grid.total_sand,
                avalanches = stats.grid.total_avalanches,
                last_avalanche = stats.grid.last_avalanche_size,
                unstable = stats.grid.unstable_count,
                sources = stats.source_count,
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Slowest tick seen so far.
    #[must_use]
    pub fn busiest_tick(&self) -> Duration {
        self.busiest_tick
    }

    /// Gets elapsed time since metrics creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` wins over `default_level` when set. Calling twice is harmless.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .finish(),
    )
    .ok();
}
