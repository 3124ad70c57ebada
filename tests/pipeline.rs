use sandpulse_core::SimConfig;
use sandpulse_lib::app::{run_headless, run_realtime, Pipeline, ShutdownManager};
use std::time::Duration;

fn config() -> SimConfig {
    let mut config = SimConfig::default();
    config.grid.size = 32;
    config.grid.seed = Some(31);
    config.grid.randomness = 0.2;
    config.sources.initial_count = 4;
    config.signal.buffer_size = 256;
    config.spectral.fft_size = 64;
    config
}

#[test]
fn test_headless_run_produces_bounded_peaks() {
    let config = config();
    let mut pipeline = Pipeline::from_config(&config).unwrap();
    let mut peaks = Vec::new();
    let step = 1.0 / config.runtime.simulation_hz;

    for _ in 0..(config.runtime.simulation_hz as usize * 6) {
        for frame in pipeline.advance(step).unwrap() {
            assert!(frame.sample.is_finite());
            assert!(frame.sample >= 0.0);
            if let Some(peak) = frame.peak {
                peaks.push(peak);
            }
        }
    }

    assert!(!peaks.is_empty());
    let nyquist = config.runtime.analysis_hz / 2.0;
    for peak in peaks {
        assert!(peak.bin >= 1 && peak.bin <= 32);
        assert!(peak.frequency > 0.0 && peak.frequency <= nyquist + 1e-9);
    }
}

#[test]
fn test_summary_reports_sand_and_signal() {
    let config = config();
    let mut pipeline = Pipeline::from_config(&config).unwrap();
    let summary = run_headless(&mut pipeline, 3.0, 1.0 / config.runtime.simulation_hz).unwrap();

    assert_eq!(summary.statistics.source_count, 4);
    assert!(summary.statistics.grid.total_sand > 0);
    assert_eq!(summary.signal.samples_written, summary.frames);
    assert!(summary.signal.peak >= summary.signal.latest);
}

#[test]
fn test_paused_simulation_flattens_signal() {
    let mut config = config();
    config.signal.baseline_noise = 0.0;
    let mut pipeline = Pipeline::from_config(&config).unwrap();
    pipeline.advance(1.0).unwrap();

    pipeline.simulation_mut().set_paused(true);
    pipeline.advance(1.0 / 30.0).unwrap();
    let before = pipeline.signal().statistics().latest;
    pipeline.advance(1.0 / 30.0).unwrap();
    let after = pipeline.signal().statistics().latest;
    assert!(after <= before);
}

#[tokio::test]
async fn test_realtime_run_honours_shutdown() {
    let mut pipeline = Pipeline::from_config(&config()).unwrap();
    let shutdown = ShutdownManager::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.request_shutdown();
    });

    let summary = run_realtime(&mut pipeline, None, Duration::from_millis(5), &shutdown)
        .await
        .unwrap();
    assert!(shutdown.is_shutdown_requested());
    assert!(summary.simulated_seconds >= 0.04);
}
