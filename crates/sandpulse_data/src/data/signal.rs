use serde::{Deserialize, Serialize};

/// Runtime-tunable knobs of the signal deriver.
///
/// Values are clamped by the deriver on write; the defaults here are the
/// starting point, not hard contracts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalParameters {
    /// Upper bound applied to the raw activity before noise and smoothing.
    pub max_signal_value: f64,
    /// One-pole smoothing factor: weight kept from the previous output.
    pub decay_factor: f64,
    /// Amplitude of the uniform baseline noise added to every sample.
    pub baseline_noise: f64,
    /// Multiplier turning the weighted mean height change into signal units.
    pub sensitivity: f64,
    /// How steeply the distance weights fall off from the reference corner.
    pub distance_scale: f64,
}

impl Default for SignalParameters {
    fn default() -> Self {
        Self {
            max_signal_value: 1.0,
            decay_factor: 0.85,
            baseline_noise: 0.002,
            sensitivity: 4.0,
            distance_scale: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalStatistics {
    pub peak: f64,
    /// Exponential moving average of the emitted samples.
    pub average: f64,
    pub latest: f64,
    pub samples_written: u64,
}
