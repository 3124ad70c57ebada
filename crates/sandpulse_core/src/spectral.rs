//! Windowed radix-2 FFT over fixed-length signal windows.
//!
//! All tables (bit-reversal permutation, per-stage twiddles, Hamming window)
//! are built once at construction. The only state that changes between
//! calls is the smoothed magnitude spectrum.

use crate::error::{CoreError, Result};
use num_complex::Complex64;
use sandpulse_data::{SpectralPeak, Spectrum};
use std::f64::consts::PI;

pub const DEFAULT_SMOOTHING: f64 = 0.8;

pub struct SpectralAnalyzer {
    size: usize,
    sample_rate: f64,
    smoothing: f64,
    bit_reversed: Vec<usize>,
    /// `twiddles[s]` holds the `2^s` factors of the stage with span `2^(s+1)`.
    twiddles: Vec<Vec<Complex64>>,
    window: Vec<f64>,
    smoothed: Vec<f64>,
    scratch: Vec<Complex64>,
}

impl SpectralAnalyzer {
    /// Builds an analyzer for `size`-point transforms.
    ///
    /// # Errors
    /// [`CoreError::InvalidTransformSize`] unless `size` is a power of two >= 2.
    pub fn new(size: usize, sample_rate: f64) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(CoreError::InvalidTransformSize(size));
        }

        let bits = size.trailing_zeros();
        let bit_reversed = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        let mut twiddles = Vec::with_capacity(bits as usize);
        let mut span = 2;
        while span <= size {
            let stage = (0..span / 2)
                .map(|k| Complex64::from_polar(1.0, -2.0 * PI * k as f64 / span as f64))
                .collect();
            twiddles.push(stage);
            span *= 2;
        }

        let denominator = (size - 1) as f64;
        let window = (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denominator).cos())
            .collect();

        Ok(Self {
            size,
            sample_rate,
            smoothing: DEFAULT_SMOOTHING,
            bit_reversed,
            twiddles,
            window,
            smoothed: vec![0.0; size / 2 + 1],
            scratch: vec![Complex64::new(0.0, 0.0); size],
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Bins per spectrum: DC through Nyquist.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    #[must_use]
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate / self.size as f64
    }

    #[must_use]
    pub fn window_coefficients(&self) -> &[f64] {
        &self.window
    }

    #[must_use]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Clamped to `[0, 0.99]`; NaN is ignored.
    pub fn set_smoothing(&mut self, factor: f64) {
        if !factor.is_nan() {
            self.smoothing = factor.clamp(0.0, 0.99);
        }
    }

    /// Transforms one window of exactly `size` samples.
    ///
    /// # Errors
    /// [`CoreError::SignalLength`] when `signal.len() != size`.
    pub fn process(&mut self, signal: &[f64]) -> Result<Spectrum> {
        if signal.len() != self.size {
            return Err(CoreError::signal_length(self.size, signal.len()));
        }

        for (i, &sample) in signal.iter().enumerate() {
            self.scratch[self.bit_reversed[i]] = Complex64::new(sample * self.window[i], 0.0);
        }
        self.transform();

        let bins = self.bins();
        let scale = 2.0 / self.size as f64;
        let mut spectrum = Spectrum {
            magnitude: Vec::with_capacity(bins),
            phase: Vec::with_capacity(bins),
            power: Vec::with_capacity(bins),
            frequencies: Vec::with_capacity(bins),
            smoothed: Vec::with_capacity(bins),
        };

        for k in 0..bins {
            let value = self.scratch[k];
            let mut magnitude = scale * value.norm();
            if k == 0 {
                magnitude /= 2.0;
            }
            let smoothed = self.smoothed[k] * self.smoothing + magnitude * (1.0 - self.smoothing);
            self.smoothed[k] = smoothed;

            spectrum.magnitude.push(magnitude);
            spectrum.phase.push(value.im.atan2(value.re));
            spectrum.power.push(magnitude * magnitude);
            spectrum.frequencies.push(self.bin_frequency(k));
            spectrum.smoothed.push(smoothed);
        }
        Ok(spectrum)
    }

    /// In-place iterative Cooley-Tukey over the bit-reversed scratch buffer.
    fn transform(&mut self) {
        let n = self.size;
        let mut half = 1;
        for stage in &self.twiddles {
            let span = half * 2;
            for start in (0..n).step_by(span) {
                for (k, &twiddle) in stage.iter().enumerate() {
                    let even = self.scratch[start + k];
                    let odd = twiddle * self.scratch[start + k + half];
                    self.scratch[start + k] = even + odd;
                    self.scratch[start + k + half] = even - odd;
                }
            }
            half = span;
        }
    }

    /// Forgets the smoothed spectrum; tables are untouched.
    pub fn reset_smoothing(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Strongest bin above DC.
    #[must_use]
    pub fn find_peak_frequency(&self, magnitude: &[f64]) -> Option<SpectralPeak> {
        magnitude
            .iter()
            .enumerate()
            .skip(1)
            .fold(None, |best: Option<(usize, f64)>, (bin, &value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((bin, value)),
            })
            .map(|(bin, magnitude)| SpectralPeak {
                frequency: self.bin_frequency(bin),
                magnitude,
                bin,
            })
    }

    /// Summed power of bins whose frequency lies in `[low_hz, high_hz]`.
    #[must_use]
    pub fn band_power(&self, spectrum: &Spectrum, low_hz: f64, high_hz: f64) -> f64 {
        spectrum
            .frequencies
            .iter()
            .zip(&spectrum.power)
            .filter(|(&f, _)| f >= low_hz && f <= high_hz)
            .map(|(_, &p)| p)
            .sum()
    }

    /// Magnitude-weighted mean frequency, DC excluded. `None` for a silent spectrum.
    #[must_use]
    pub fn spectral_centroid(&self, spectrum: &Spectrum) -> Option<f64> {
        let (weighted, total) = spectrum
            .frequencies
            .iter()
            .zip(&spectrum.magnitude)
            .skip(1)
            .fold((0.0, 0.0), |(w, t), (&f, &m)| (w + f * m, t + m));
        (total > 0.0).then(|| weighted / total)
    }
}
