use serde::{Deserialize, Serialize};

/// Output of one spectral transform.
///
/// Every vector holds one entry per bin, DC through Nyquist inclusive.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub magnitude: Vec<f64>,
    pub phase: Vec<f64>,
    pub power: Vec<f64>,
    pub frequencies: Vec<f64>,
    /// Magnitude after exponential smoothing across successive calls.
    pub smoothed: Vec<f64>,
}

impl Spectrum {
    #[must_use]
    pub fn bins(&self) -> usize {
        self.magnitude.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }
}

/// Strongest non-DC bin of a magnitude spectrum.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub frequency: f64,
    pub magnitude: f64,
    pub bin: usize,
}
