//! Drives a [`Pipeline`] either on a simulated clock or on wall-clock time.

use super::pipeline::Pipeline;
use super::shutdown::ShutdownManager;
use anyhow::Result;
use sandpulse_data::{SignalStatistics, SimulationStatistics, SpectralPeak};
use std::time::{Duration, Instant};

/// Frames between peak-frequency log lines.
const PEAK_LOG_EVERY: u64 = 30;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Simulated clock, runs as fast as the CPU allows.
    Headless,
    /// Ticks paced by a tokio interval.
    Realtime,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub simulated_seconds: f64,
    pub frames: u64,
    pub last_peak: Option<SpectralPeak>,
    pub statistics: SimulationStatistics,
    pub signal: SignalStatistics,
    /// Wall time since the pipeline was built.
    pub wall_time: Duration,
    pub busiest_tick: Duration,
}

impl RunSummary {
    fn collect(pipeline: &Pipeline, simulated_seconds: f64, last_peak: Option<SpectralPeak>) -> Self {
        Self {
            simulated_seconds,
            frames: pipeline.frames(),
            last_peak,
            statistics: pipeline.simulation().statistics(),
            signal: pipeline.signal().statistics(),
            wall_time: pipeline.metrics().elapsed(),
            busiest_tick: pipeline.metrics().busiest_tick(),
        }
    }
}

fn observe(frames: &[super::pipeline::PipelineFrame], last_peak: &mut Option<SpectralPeak>) {
    for frame in frames {
        if let Some(peak) = frame.peak {
            *last_peak = Some(peak);
            if frame.frame % PEAK_LOG_EVERY == 0 {
                tracing::info!(
                    frame = frame.frame,
                    frequency = peak.frequency,
                    magnitude = peak.magnitude,
                    sample = frame.sample,
                    "Dominant frequency"
                );
            }
        }
    }
}

/// Runs `seconds` of simulated time in fixed steps of `step` seconds.
pub fn run_headless(pipeline: &mut Pipeline, seconds: f64, step: f64) -> Result<RunSummary> {
    anyhow::ensure!(step > 0.0, "Step must be positive");
    let steps = (seconds.max(0.0) / step).round() as u64;
    let mut last_peak = None;
    for _ in 0..steps {
        let frames = pipeline.advance(step)?;
        observe(&frames, &mut last_peak);
    }
    Ok(RunSummary::collect(pipeline, steps as f64 * step, last_peak))
}

/// Runs against the wall clock until `seconds` pass (if given) or shutdown
/// is requested.
pub async fn run_realtime(
    pipeline: &mut Pipeline,
    seconds: Option<f64>,
    period: Duration,
    shutdown: &ShutdownManager,
) -> Result<RunSummary> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut last = started;
    let mut last_peak = None;
    loop {
        interval.tick().await;
        if shutdown.is_shutdown_requested() {
            break;
        }
        let now = Instant::now();
        let frames = pipeline.advance(now.duration_since(last).as_secs_f64())?;
        last = now;
        observe(&frames, &mut last_peak);

        if seconds.is_some_and(|limit| started.elapsed().as_secs_f64() >= limit) {
            break;
        }
    }
    Ok(RunSummary::collect(
        pipeline,
        started.elapsed().as_secs_f64(),
        last_peak,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandpulse_core::SimConfig;

    fn pipeline() -> Pipeline {
        let mut config = SimConfig::default();
        config.grid.size = 24;
        config.grid.seed = Some(1);
        config.spectral.fft_size = 32;
        config.signal.buffer_size = 64;
        Pipeline::from_config(&config).unwrap()
    }

    #[test]
    fn test_headless_runs_requested_time() {
        let mut pipeline = pipeline();
        let summary = run_headless(&mut pipeline, 4.0, 1.0 / 60.0).unwrap();
        assert!((summary.simulated_seconds - 4.0).abs() < 1e-9);
        assert!((119..=120).contains(&summary.frames));
        assert!(summary.last_peak.is_some());
        assert_eq!(summary.statistics.source_count, 3);
        assert!(summary.statistics.total_emitted > 0);
        assert!(summary.wall_time > Duration::ZERO);
        assert!(summary.busiest_tick <= summary.wall_time);
    }

    #[test]
    fn test_mode_parses_from_cli_names() {
        use clap::ValueEnum;
        assert_eq!(RunMode::from_str("headless", true).unwrap(), RunMode::Headless);
        assert_eq!(RunMode::from_str("Realtime", true).unwrap(), RunMode::Realtime);
        assert!(RunMode::from_str("turbo", true).is_err());
    }

    #[test]
    fn test_headless_rejects_zero_step() {
        let mut pipeline = pipeline();
        assert!(run_headless(&mut pipeline, 1.0, 0.0).is_err());
    }

    #[tokio::test]
    async fn test_realtime_stops_on_shutdown() {
        let mut pipeline = pipeline();
        let shutdown = ShutdownManager::new();
        shutdown.request_shutdown();
        let summary = run_realtime(&mut pipeline, None, Duration::from_millis(5), &shutdown)
            .await
            .unwrap();
        assert_eq!(summary.frames, 0);
    }

    #[tokio::test]
    async fn test_realtime_stops_after_duration() {
        let mut pipeline = pipeline();
        let shutdown = ShutdownManager::new();
        let summary = run_realtime(
            &mut pipeline,
            Some(0.1),
            Duration::from_millis(10),
            &shutdown,
        )
        .await
        .unwrap();
        assert!(summary.simulated_seconds >= 0.1);
        assert!(pipeline.simulation().statistics().ticks > 0);
    }
}
