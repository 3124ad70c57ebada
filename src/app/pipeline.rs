//! Fixed-step producer/consumer pipeline.
//!
//! The simulation ticks at `simulation_hz`; the signal deriver and spectral
//! analyzer run at the lower `analysis_hz`. Both clocks share one timeline,
//! so a consumer tick only sees simulation steps due up to its deadline.

use anyhow::Result;
use sandpulse_core::{SignalDeriver, SimConfig, Simulation, SpectralAnalyzer, TickMetrics};
use sandpulse_data::{SpectralPeak, Spectrum};
use std::time::Instant;

/// Deadlines closer than this count as simultaneous.
const DEADLINE_EPSILON: f64 = 1e-9;

/// Output of one consumer tick.
#[derive(Debug, Clone)]
pub struct PipelineFrame {
    /// Consumer tick counter, starting at 1.
    pub frame: u64,
    pub sample: f64,
    /// Present once the buffer holds a full transform window.
    pub spectrum: Option<Spectrum>,
    pub peak: Option<SpectralPeak>,
}

pub struct Pipeline {
    simulation: Simulation,
    signal: SignalDeriver,
    analyzer: SpectralAnalyzer,
    metrics: TickMetrics,
    seed: u64,
    simulation_step: f64,
    analysis_step: f64,
    max_catch_up_steps: usize,
    simulation_backlog: f64,
    analysis_backlog: f64,
    frames: u64,
}

impl Pipeline {
    /// Validates `config` and builds every component from it.
    ///
    /// A missing seed is drawn once here so all components share one lineage.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.grid.seed.unwrap_or_else(rand::random);
        let mut seeded = config.clone();
        seeded.grid.seed = Some(seed);

        let simulation = Simulation::from_config(&seeded)?;
        let signal = SignalDeriver::with_parameters(
            config.grid.size,
            config.signal.buffer_size,
            config.runtime.analysis_hz,
            config.signal.parameters(),
            seed.wrapping_add(1),
        )?;
        let mut analyzer =
            SpectralAnalyzer::new(config.spectral.fft_size, config.runtime.analysis_hz)?;
        analyzer.set_smoothing(config.spectral.smoothing);

        tracing::info!(
            seed,
            fingerprint = %config.fingerprint(),
            grid = config.grid.size,
            fft = config.spectral.fft_size,
            "Pipeline ready"
        );

        Ok(Self {
            simulation,
            signal,
            analyzer,
            metrics: TickMetrics::new(config.runtime.log_interval),
            seed,
            simulation_step: 1.0 / config.runtime.simulation_hz,
            analysis_step: 1.0 / config.runtime.analysis_hz,
            max_catch_up_steps: config.runtime.max_catch_up_steps,
            simulation_backlog: 0.0,
            analysis_backlog: 0.0,
            frames: 0,
        })
    }

    /// Feeds `elapsed` wall seconds through both clocks.
    ///
    /// Due steps run in timestamp order, so each consumer tick sees the grid
    /// as of its own deadline regardless of how callers chunk time. A
    /// simulation step sharing a deadline with a consumer tick runs first.
    /// Each clock runs at most `max_catch_up_steps` steps per call; any
    /// backlog beyond that is dropped rather than replayed in a burst.
    pub fn advance(&mut self, elapsed: f64) -> Result<Vec<PipelineFrame>> {
        let elapsed = if elapsed.is_finite() && elapsed > 0.0 {
            elapsed
        } else {
            0.0
        };
        self.simulation_backlog += elapsed;
        self.analysis_backlog += elapsed;

        let mut steps = 0;
        let mut frames = Vec::new();
        loop {
            let simulation_due = is_due(self.simulation_backlog, self.simulation_step)
                && steps < self.max_catch_up_steps;
            let analysis_due = is_due(self.analysis_backlog, self.analysis_step)
                && frames.len() < self.max_catch_up_steps;

            // How long before the end of this call each pending deadline fell.
            let simulation_lead = self.simulation_backlog - self.simulation_step;
            let analysis_lead = self.analysis_backlog - self.analysis_step;

            match (simulation_due, analysis_due) {
                (false, false) => break,
                (true, true) if analysis_lead > simulation_lead + DEADLINE_EPSILON => {
                    frames.push(self.step_analysis()?);
                    self.analysis_backlog -= self.analysis_step;
                }
                (true, _) => {
                    self.step_simulation();
                    self.simulation_backlog -= self.simulation_step;
                    steps += 1;
                }
                (false, true) => {
                    frames.push(self.step_analysis()?);
                    self.analysis_backlog -= self.analysis_step;
                }
            }
        }

        if is_due(self.simulation_backlog, self.simulation_step) {
            let dropped = (self.simulation_backlog / self.simulation_step).floor() as u64;
            tracing::debug!(dropped, "Simulation fell behind, dropping steps");
            self.simulation_backlog %= self.simulation_step;
        }
        if is_due(self.analysis_backlog, self.analysis_step) {
            tracing::debug!("Analysis fell behind, dropping frames");
            self.analysis_backlog %= self.analysis_step;
        }

        Ok(frames)
    }

    fn step_simulation(&mut self) {
        let started = Instant::now();
        self.simulation.update(self.simulation_step);
        self.metrics
            .record_tick(started.elapsed(), &self.simulation.statistics());
    }

    fn step_analysis(&mut self) -> Result<PipelineFrame> {
        let sample = self.signal.update(self.simulation.grid().cells())?;
        self.frames += 1;

        let size = self.analyzer.size();
        let (spectrum, peak) = if self.signal.buffer().len() >= size {
            let spectrum = self.analyzer.process(&self.signal.get_signal_data(size))?;
            let peak = self.analyzer.find_peak_frequency(&spectrum.magnitude);
            (Some(spectrum), peak)
        } else {
            (None, None)
        };

        Ok(PipelineFrame {
            frame: self.frames,
            sample,
            spectrum,
            peak,
        })
    }

    /// Clears grid, signal and smoothing; sources and settings stay.
    pub fn reset(&mut self) {
        self.simulation.reset();
        self.signal.reset();
        self.analyzer.reset_smoothing();
        self.simulation_backlog = 0.0;
        self.analysis_backlog = 0.0;
        self.frames = 0;
        tracing::info!("Pipeline reset");
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    #[must_use]
    pub fn signal(&self) -> &SignalDeriver {
        &self.signal
    }

    pub fn signal_mut(&mut self) -> &mut SignalDeriver {
        &mut self.signal
    }

    #[must_use]
    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut SpectralAnalyzer {
        &mut self.analyzer
    }

    #[must_use]
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}

#[inline]
fn is_due(backlog: f64, step: f64) -> bool {
    backlog + DEADLINE_EPSILON >= step
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.grid.size = 16;
        config.grid.seed = Some(9);
        config.signal.buffer_size = 64;
        config.spectral.fft_size = 16;
        config.runtime.simulation_hz = 60.0;
        config.runtime.analysis_hz = 30.0;
        config
    }

    #[test]
    fn test_rates_are_decoupled() {
        let mut pipeline = Pipeline::from_config(&small_config()).unwrap();
        let mut frames = 0;
        for _ in 0..60 {
            frames += pipeline.advance(1.0 / 60.0).unwrap().len();
        }
        let ticks = pipeline.simulation().statistics().ticks;
        assert!((59..=60).contains(&ticks));
        assert!((29..=30).contains(&frames));
    }

    #[test]
    fn test_spectrum_appears_once_window_fills() {
        let mut pipeline = Pipeline::from_config(&small_config()).unwrap();
        let mut first_spectrum = None;
        for _ in 0..40 {
            for frame in pipeline.advance(1.0 / 30.0).unwrap() {
                if frame.spectrum.is_some() && first_spectrum.is_none() {
                    first_spectrum = Some(frame.frame);
                }
            }
        }
        assert_eq!(first_spectrum, Some(16));
    }

    #[test]
    fn test_large_gap_is_capped() {
        let mut pipeline = Pipeline::from_config(&small_config()).unwrap();
        let frames = pipeline.advance(10.0).unwrap();
        assert_eq!(frames.len(), 8);
        assert_eq!(pipeline.simulation().statistics().ticks, 8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.spectral.fft_size = 24;
        assert!(Pipeline::from_config(&config).is_err());
    }

    #[test]
    fn test_reset_clears_frames() {
        let mut pipeline = Pipeline::from_config(&small_config()).unwrap();
        pipeline.advance(0.5).unwrap();
        pipeline.reset();
        assert_eq!(pipeline.frames(), 0);
        assert_eq!(pipeline.simulation().statistics().grid.total_sand, 0);
        assert!(pipeline.signal().get_signal_data(4).is_empty());
    }

    fn dripping_pipeline() -> Pipeline {
        let mut config = small_config();
        config.sources.initial_count = 0;
        config.signal.baseline_noise = 0.0;
        config.signal.decay_factor = 0.0;
        let mut pipeline = Pipeline::from_config(&config).unwrap();
        pipeline.simulation_mut().add_source(8, 8, 60.0).unwrap();
        pipeline
    }

    #[test]
    fn test_samples_do_not_depend_on_chunking() {
        let mut whole = dripping_pipeline();
        let mut split = dripping_pipeline();

        let mut batched = Vec::new();
        let mut single = Vec::new();
        for _ in 0..4 {
            batched.extend(whole.advance(2.0 / 30.0).unwrap().iter().map(|f| f.sample));
            for _ in 0..2 {
                single.extend(split.advance(1.0 / 30.0).unwrap().iter().map(|f| f.sample));
            }
        }

        assert_eq!(batched.len(), 8);
        assert_eq!(batched, single);
        assert!(batched[1..].iter().all(|&s| s > 0.0), "{batched:?}");
        assert_eq!(
            whole.simulation().export_state(),
            split.simulation().export_state()
        );
    }
}
