//! Activity signal derived from successive grid snapshots.
//!
//! Every update compares the new snapshot against the previous one, weights
//! each changed cell by its proximity to the reference corner `(0, 0)`, and
//! turns the weighted mean change into one smoothed sample.

use crate::error::{CoreError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandpulse_data::{SignalParameters, SignalStatistics};

/// Smoothing factor of the running average statistic.
const AVERAGE_ALPHA: f64 = 0.05;

/// Fixed-capacity circular sample store.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    samples: Vec<f64>,
    cursor: usize,
    wrapped: bool,
}

impl SignalBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::InvalidBufferSize(capacity));
        }
        Ok(Self {
            samples: vec![0.0; capacity],
            cursor: 0,
            wrapped: false,
        })
    }

    pub fn push(&mut self, value: f64) {
        self.samples[self.cursor] = value;
        self.cursor += 1;
        if self.cursor == self.samples.len() {
            self.cursor = 0;
            self.wrapped = true;
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Samples actually written, capped at capacity.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.wrapped {
            self.samples.len()
        } else {
            self.cursor
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn has_wrapped(&self) -> bool {
        self.wrapped
    }

    #[must_use]
    pub fn latest(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let cap = self.samples.len();
        Some(self.samples[(self.cursor + cap - 1) % cap])
    }

    /// Up to `length` most recent samples, oldest first.
    #[must_use]
    pub fn recent(&self, length: usize) -> Vec<f64> {
        let count = length.min(self.len());
        let cap = self.samples.len();
        let start = (self.cursor + cap - count) % cap;
        (0..count)
            .map(|i| self.samples[(start + i) % cap])
            .collect()
    }

    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.cursor = 0;
        self.wrapped = false;
    }
}

/// Turns sandpile activity into a scalar time series.
pub struct SignalDeriver {
    grid_size: usize,
    sample_rate: f64,
    weights: Vec<f64>,
    snapshots: [Vec<u32>; 2],
    front: usize,
    primed: bool,
    buffer: SignalBuffer,
    params: SignalParameters,
    last_output: f64,
    peak: f64,
    average: f64,
    samples_written: u64,
    rng: ChaCha8Rng,
}

impl SignalDeriver {
    /// `sample_rate` is nominal: it only labels the series for consumers.
    pub fn new(grid_size: usize, buffer_size: usize, sample_rate: f64, seed: u64) -> Result<Self> {
        Self::with_parameters(
            grid_size,
            buffer_size,
            sample_rate,
            SignalParameters::default(),
            seed,
        )
    }

    pub fn with_parameters(
        grid_size: usize,
        buffer_size: usize,
        sample_rate: f64,
        params: SignalParameters,
        seed: u64,
    ) -> Result<Self> {
        if grid_size == 0 {
            return Err(CoreError::InvalidGridSize(grid_size));
        }
        let area = grid_size * grid_size;
        let mut deriver = Self {
            grid_size,
            sample_rate,
            weights: Vec::with_capacity(area),
            snapshots: [vec![0; area], vec![0; area]],
            front: 0,
            primed: false,
            buffer: SignalBuffer::new(buffer_size)?,
            params: SignalParameters::default(),
            last_output: 0.0,
            peak: 0.0,
            average: 0.0,
            samples_written: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        deriver.set_parameters(params);
        deriver.rebuild_weights();
        Ok(deriver)
    }

    /// `1 / (1 + k * d / d_max)` with `d` measured from `(0, 0)`.
    fn rebuild_weights(&mut self) {
        let n = self.grid_size;
        let max_distance = match n {
            1 => 1.0,
            _ => std::f64::consts::SQRT_2 * (n - 1) as f64,
        };
        let k = self.params.distance_scale;
        self.weights.clear();
        for x in 0..n {
            for y in 0..n {
                let distance = ((x * x + y * y) as f64).sqrt();
                self.weights.push(1.0 / (1.0 + k * distance / max_distance));
            }
        }
    }

    /// Weight of a cell, mainly for inspection.
    #[must_use]
    pub fn weight(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.grid_size && y < self.grid_size {
            Some(self.weights[x * self.grid_size + y])
        } else {
            None
        }
    }

    /// Ingests a flat snapshot (index `x * size + y`) and emits one sample.
    ///
    /// The first call only primes the comparison baseline, so its sample is
    /// pure baseline noise.
    pub fn update(&mut self, grid: &[u32]) -> Result<f64> {
        let expected = self.grid_size * self.grid_size;
        if grid.len() != expected {
            return Err(CoreError::SnapshotSize {
                expected,
                actual: grid.len(),
            });
        }

        let back = 1 - self.front;
        self.snapshots[back].copy_from_slice(grid);
        let first = !self.primed;
        let activity = if first {
            self.primed = true;
            0.0
        } else {
            self.activity(back)
        };
        self.front = back;

        let noise = self.noise();
        let sample = if first {
            noise
        } else {
            let raw = (activity * self.params.sensitivity).min(self.params.max_signal_value) + noise;
            let decay = self.params.decay_factor;
            self.last_output * decay + raw * (1.0 - decay)
        };

        self.record(sample);
        Ok(sample)
    }

    /// Weighted mean absolute height change between front and `back`.
    fn activity(&self, back: usize) -> f64 {
        let previous = &self.snapshots[self.front];
        let current = &self.snapshots[back];
        let mut weighted = 0.0;
        let mut weight_sum = 0.0;
        for ((&before, &after), &weight) in previous.iter().zip(current).zip(&self.weights) {
            if before != after {
                weighted += weight * f64::from(before.abs_diff(after));
                weight_sum += weight;
            }
        }
        if weight_sum > 0.0 {
            weighted / weight_sum
        } else {
            0.0
        }
    }

    fn noise(&mut self) -> f64 {
        let amplitude = self.params.baseline_noise;
        if amplitude > 0.0 {
            self.rng.gen_range(0.0..amplitude)
        } else {
            0.0
        }
    }

    fn record(&mut self, sample: f64) {
        self.buffer.push(sample);
        self.last_output = sample;
        self.peak = self.peak.max(sample);
        self.average = if self.samples_written == 0 {
            sample
        } else {
            self.average * (1.0 - AVERAGE_ALPHA) + sample * AVERAGE_ALPHA
        };
        self.samples_written += 1;
    }

    /// Up to `length` most recent samples, most recent last.
    #[must_use]
    pub fn get_signal_data(&self, length: usize) -> Vec<f64> {
        self.buffer.recent(length)
    }

    /// Exactly `length` samples, left-padded with zeros while the buffer fills.
    #[must_use]
    pub fn window(&self, length: usize) -> Vec<f64> {
        let recent = self.buffer.recent(length);
        let mut window = vec![0.0; length - recent.len()];
        window.extend(recent);
        window
    }

    /// Applies new parameters, clamping each to a sane range. NaN keeps the
    /// current value.
    pub fn set_parameters(&mut self, params: SignalParameters) {
        let current = self.params;
        let scale_before = current.distance_scale;
        self.params = SignalParameters {
            max_signal_value: clamp_or(params.max_signal_value, 1e-3, 1e3, current.max_signal_value),
            decay_factor: clamp_or(params.decay_factor, 0.0, 0.999, current.decay_factor),
            baseline_noise: clamp_or(params.baseline_noise, 0.0, 1.0, current.baseline_noise),
            sensitivity: clamp_or(params.sensitivity, 0.0, 1e3, current.sensitivity),
            distance_scale: clamp_or(params.distance_scale, 0.0, 100.0, current.distance_scale),
        };
        if self.params.distance_scale != scale_before && !self.weights.is_empty() {
            self.rebuild_weights();
        }
    }

    #[must_use]
    pub fn get_parameters(&self) -> SignalParameters {
        self.params
    }

    #[must_use]
    pub fn statistics(&self) -> SignalStatistics {
        SignalStatistics {
            peak: self.peak,
            average: self.average,
            latest: self.last_output,
            samples_written: self.samples_written,
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    #[must_use]
    pub fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }

    /// Clears samples, the previous snapshot and all running statistics.
    pub fn reset(&mut self) {
        self.buffer.reset();
        for snapshot in &mut self.snapshots {
            snapshot.fill(0);
        }
        self.front = 0;
        self.primed = false;
        self.last_output = 0.0;
        self.peak = 0.0;
        self.average = 0.0;
        self.samples_written = 0;
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
