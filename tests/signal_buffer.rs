use sandpulse_core::{CoreError, SignalDeriver};
use sandpulse_data::SignalParameters;

fn snapshot(size: usize, step: u32) -> Vec<u32> {
    (0..size * size)
        .map(|i| (i as u32 + step) % 4)
        .collect()
}

#[test]
fn test_buffer_keeps_latest_four_of_six() {
    let mut deriver = SignalDeriver::new(4, 4, 30.0, 7).unwrap();
    let samples: Vec<f64> = (0..6)
        .map(|step| deriver.update(&snapshot(4, step)).unwrap())
        .collect();

    assert_eq!(deriver.get_signal_data(4), samples[2..].to_vec());
    assert_eq!(deriver.get_signal_data(10), samples[2..].to_vec());
    assert_eq!(deriver.get_signal_data(2), samples[4..].to_vec());
}

#[test]
fn test_window_pads_missing_history_with_zeros() {
    let mut deriver = SignalDeriver::new(4, 8, 30.0, 7).unwrap();
    let a = deriver.update(&snapshot(4, 0)).unwrap();
    let b = deriver.update(&snapshot(4, 1)).unwrap();

    assert_eq!(deriver.window(4), vec![0.0, 0.0, a, b]);
    assert_eq!(deriver.get_signal_data(4), vec![a, b]);
}

#[test]
fn test_quiet_grid_yields_silence_without_noise() {
    let params = SignalParameters {
        baseline_noise: 0.0,
        ..SignalParameters::default()
    };
    let mut deriver = SignalDeriver::with_parameters(4, 16, 30.0, params, 1).unwrap();
    let grid = snapshot(4, 0);
    for _ in 0..10 {
        assert_eq!(deriver.update(&grid).unwrap(), 0.0);
    }
    assert_eq!(deriver.statistics().peak, 0.0);
}

#[test]
fn test_activity_raises_and_then_decays() {
    let params = SignalParameters {
        baseline_noise: 0.0,
        ..SignalParameters::default()
    };
    let mut deriver = SignalDeriver::with_parameters(4, 16, 30.0, params, 1).unwrap();
    deriver.update(&snapshot(4, 0)).unwrap();
    let burst = deriver.update(&snapshot(4, 1)).unwrap();
    assert!(burst > 0.0);

    let mut previous = burst;
    for _ in 0..5 {
        let sample = deriver.update(&snapshot(4, 1)).unwrap();
        assert!(sample < previous, "Signal should decay once activity stops");
        previous = sample;
    }
    assert!(burst <= params.max_signal_value);
}

#[test]
fn test_noise_stays_within_amplitude() {
    let mut deriver = SignalDeriver::new(4, 64, 30.0, 99).unwrap();
    let amplitude = deriver.get_parameters().baseline_noise;
    let first = deriver.update(&snapshot(4, 0)).unwrap();
    assert!((0.0..amplitude).contains(&first));
}

#[test]
fn test_snapshot_size_checked() {
    let mut deriver = SignalDeriver::new(4, 4, 30.0, 0).unwrap();
    assert!(matches!(
        deriver.update(&[0; 9]),
        Err(CoreError::SnapshotSize { expected: 16, actual: 9 })
    ));
    assert!(deriver.buffer().is_empty());
}

#[test]
fn test_zero_buffer_rejected() {
    assert!(SignalDeriver::new(4, 0, 30.0, 0).is_err());
}
