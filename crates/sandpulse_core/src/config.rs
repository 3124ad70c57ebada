//! Configuration management for simulation parameters.
//!
//! Strongly-typed sections that map to `sandpulse.toml`. Every field has a
//! default, so a partial file only overrides what it names.
//!
//! ## Example `sandpulse.toml`
//!
//! ```toml
//! [grid]
//! size = 64
//! critical_mass = 4
//! randomness = 0.25
//! seed = 42
//!
//! [signal]
//! decay_factor = 0.9
//!
//! [spectral]
//! fft_size = 256
//! ```

use sandpulse_data::SignalParameters;
use serde::{Deserialize, Serialize};

/// Sandpile dimensions and physics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub size: usize,
    pub critical_mass: u32,
    /// Jitter strength in `[0, 1]`; 0 keeps the classic deterministic rule.
    pub randomness: f64,
    pub seed: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 64,
            critical_mass: 4,
            randomness: 0.0,
            seed: None,
        }
    }
}

/// Emission and per-tick relaxation budget.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub initial_count: usize,
    /// Grains per second drawn for random sources.
    pub rate_min: f64,
    pub rate_max: f64,
    pub max_iterations_per_tick: usize,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Cells kept clear of the border when placing random sources.
    pub edge_margin: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            initial_count: 3,
            rate_min: 2.0,
            rate_max: 8.0,
            max_iterations_per_tick: 5,
            speed_min: 0.1,
            speed_max: 10.0,
            edge_margin: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SignalConfig {
    pub buffer_size: usize,
    pub max_signal_value: f64,
    pub decay_factor: f64,
    pub baseline_noise: f64,
    pub sensitivity: f64,
    pub distance_scale: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        let params = SignalParameters::default();
        Self {
            buffer_size: 512,
            max_signal_value: params.max_signal_value,
            decay_factor: params.decay_factor,
            baseline_noise: params.baseline_noise,
            sensitivity: params.sensitivity,
            distance_scale: params.distance_scale,
        }
    }
}

impl SignalConfig {
    #[must_use]
    pub fn parameters(&self) -> SignalParameters {
        SignalParameters {
            max_signal_value: self.max_signal_value,
            decay_factor: self.decay_factor,
            baseline_noise: self.baseline_noise,
            sensitivity: self.sensitivity,
            distance_scale: self.distance_scale,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpectralConfig {
    /// Must be a power of two.
    pub fft_size: usize,
    pub smoothing: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
        }
    }
}

/// Tick rates for the producer (simulation) and consumer (analysis) sides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub simulation_hz: f64,
    /// Also the nominal sample rate of the derived signal.
    pub analysis_hz: f64,
    pub max_catch_up_steps: usize,
    /// Ticks between periodic progress log lines.
    pub log_interval: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            simulation_hz: 60.0,
            analysis_hz: 30.0,
            max_catch_up_steps: 8,
            log_interval: 600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub grid: GridConfig,
    pub sources: SourceConfig,
    pub signal: SignalConfig,
    pub spectral: SpectralConfig,
    pub runtime: RuntimeConfig,
}

impl SimConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Grid validation
        anyhow::ensure!(self.grid.size > 0, "Grid size must be positive");
        anyhow::ensure!(self.grid.size <= 4096, "Grid size too large (max 4096)");
        anyhow::ensure!(
            self.grid.critical_mass >= 4,
            "Critical mass must be at least 4"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.grid.randomness),
            "Randomness must be in [0.0, 1.0]"
        );

        // Source validation
        anyhow::ensure!(
            self.sources.rate_min >= 0.0 && self.sources.rate_min.is_finite(),
            "Minimum source rate must be non-negative"
        );
        anyhow::ensure!(
            self.sources.rate_max >= self.sources.rate_min && self.sources.rate_max.is_finite(),
            "Maximum source rate must be >= minimum source rate"
        );
        anyhow::ensure!(
            self.sources.max_iterations_per_tick > 0,
            "Relaxation passes per tick must be positive"
        );
        anyhow::ensure!(
            self.sources.speed_min >= 0.0 && self.sources.speed_max >= self.sources.speed_min,
            "Speed range must be non-negative and ordered"
        );

        // Signal validation
        anyhow::ensure!(self.signal.buffer_size > 0, "Signal buffer must be positive");
        anyhow::ensure!(
            self.signal.max_signal_value > 0.0,
            "Max signal value must be positive"
        );
        anyhow::ensure!(
            (0.0..1.0).contains(&self.signal.decay_factor),
            "Decay factor must be in [0.0, 1.0)"
        );
        anyhow::ensure!(
            self.signal.baseline_noise >= 0.0,
            "Baseline noise must be non-negative"
        );
        anyhow::ensure!(
            self.signal.sensitivity >= 0.0,
            "Sensitivity must be non-negative"
        );
        anyhow::ensure!(
            self.signal.distance_scale >= 0.0,
            "Distance scale must be non-negative"
        );

        // Spectral validation
        anyhow::ensure!(
            self.spectral.fft_size >= 2 && self.spectral.fft_size.is_power_of_two(),
            "FFT size must be a power of two >= 2"
        );
        anyhow::ensure!(
            (0.0..1.0).contains(&self.spectral.smoothing),
            "Spectral smoothing must be in [0.0, 1.0)"
        );

        // Runtime validation
        anyhow::ensure!(
            self.runtime.simulation_hz > 0.0 && self.runtime.simulation_hz <= 1000.0,
            "Simulation rate must be in (0, 1000] Hz"
        );
        anyhow::ensure!(
            self.runtime.analysis_hz > 0.0 && self.runtime.analysis_hz <= self.runtime.simulation_hz,
            "Analysis rate must be positive and not exceed the simulation rate"
        );
        anyhow::ensure!(
            self.runtime.max_catch_up_steps > 0,
            "Catch-up steps must be positive"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of every physics-relevant setting, logged so runs can be matched up.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.grid).as_bytes());
        hasher.update(format!("{:?}", self.sources).as_bytes());
        hasher.update(format!("{:?}", self.signal).as_bytes());
        hasher.update(format!("{:?}", self.spectral).as_bytes());
        hex::encode(hasher.finalize())
    }
}
