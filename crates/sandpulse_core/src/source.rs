//! Sand emission points.

use sandpulse_data::SourceRecord;

/// A fixed grid position that drips grains at a steady rate.
///
/// Fractional grains are carried in `accumulator` between ticks so the
/// long-run emission matches `rate` exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct SandSource {
    pub x: usize,
    pub y: usize,
    /// Grains per second at global speed 1.0.
    pub rate: f64,
    pub active: bool,
    accumulator: f64,
}

impl SandSource {
    #[must_use]
    pub fn new(x: usize, y: usize, rate: f64) -> Self {
        Self {
            x,
            y,
            rate: sanitize_rate(rate),
            active: true,
            accumulator: 0.0,
        }
    }

    /// Advances the carry by `scaled_elapsed` seconds and returns whole grains due.
    ///
    /// Inactive sources neither emit nor accumulate.
    pub fn emit(&mut self, scaled_elapsed: f64) -> u32 {
        if !self.active {
            return 0;
        }
        self.accumulator += self.rate * scaled_elapsed;
        let grains = self.accumulator.floor().min(f64::from(u32::MAX));
        if grains < 1.0 {
            return 0;
        }
        self.accumulator -= grains;
        grains as u32
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = sanitize_rate(rate);
    }

    /// Fractional grains waiting to be emitted.
    #[must_use]
    pub fn pending(&self) -> f64 {
        self.accumulator
    }

    pub fn clear_pending(&mut self) {
        self.accumulator = 0.0;
    }

    #[must_use]
    pub fn to_record(&self) -> SourceRecord {
        SourceRecord {
            grid_x: self.x,
            grid_y: self.y,
            sand_rate: self.rate,
            active: self.active,
        }
    }
}

impl From<&SourceRecord> for SandSource {
    fn from(record: &SourceRecord) -> Self {
        let mut source = Self::new(record.grid_x, record.grid_y, record.sand_rate);
        source.active = record.active;
        source
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.max(0.0)
    } else {
        0.0
    }
}
