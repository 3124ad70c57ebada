//! Simulation controller: turns elapsed time into grains and bounds relaxation.
//!
//! One [`Simulation::update`] call is one producer tick. Sources emit first,
//! then the grid gets at most `max_iterations_per_tick` relaxation passes.
//! Whatever is still unstable after that waits for the next tick.

use crate::config::{SimConfig, SourceConfig};
use crate::error::{CoreError, Result};
use crate::grid::SandpileGrid;
use crate::source::SandSource;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandpulse_data::{ExportedState, SimulationStatistics};

pub struct Simulation {
    grid: SandpileGrid,
    sources: Vec<SandSource>,
    settings: SourceConfig,
    global_speed: f64,
    paused: bool,
    last_timestamp: Option<f64>,
    rng: ChaCha8Rng,
    total_emitted: u64,
    ticks: u64,
}

impl Simulation {
    /// Wraps an existing grid with no sources.
    #[must_use]
    pub fn new(grid: SandpileGrid, settings: SourceConfig, seed: u64) -> Self {
        Self {
            grid,
            sources: Vec::new(),
            settings,
            global_speed: 1.0,
            paused: false,
            last_timestamp: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            total_emitted: 0,
            ticks: 0,
        }
    }

    /// Builds grid and sources from configuration.
    ///
    /// Without a configured seed one is drawn from the thread RNG.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let seed = config.grid.seed.unwrap_or_else(rand::random);
        let mut seeder = ChaCha8Rng::seed_from_u64(seed);

        let mut grid = SandpileGrid::new(config.grid.size, config.grid.critical_mass, seeder.gen())?;
        grid.set_randomness_factor(config.grid.randomness);

        let mut sim = Self::new(grid, config.sources.clone(), seeder.gen());
        for _ in 0..config.sources.initial_count {
            sim.add_random_source();
        }
        tracing::debug!(
            seed,
            size = config.grid.size,
            sources = sim.sources.len(),
            "Simulation created"
        );
        Ok(sim)
    }

    /// Advances by `elapsed` seconds. Negative or non-finite input counts as zero.
    ///
    /// Does nothing at all while paused.
    pub fn update(&mut self, elapsed: f64) {
        if self.paused {
            return;
        }
        let elapsed = if elapsed.is_finite() && elapsed > 0.0 {
            elapsed
        } else {
            0.0
        };

        let scaled = elapsed * self.global_speed;
        for source in &mut self.sources {
            let grains = source.emit(scaled);
            if grains > 0 {
                self.grid.add_sand(source.x as i64, source.y as i64, grains);
                self.total_emitted += u64::from(grains);
            }
        }

        let passes = self.grid.stabilize(self.settings.max_iterations_per_tick);
        if !self.grid.is_stable() {
            tracing::debug!(
                passes,
                unstable = self.grid.unstable_count(),
                "Relaxation budget spent, carrying unstable cells to next tick"
            );
        }
        self.ticks += 1;
    }

    /// Advances to an absolute timestamp in seconds.
    ///
    /// The first call after construction or resume only sets the baseline.
    pub fn advance_to(&mut self, timestamp: f64) {
        if self.paused {
            return;
        }
        let elapsed = match self.last_timestamp {
            Some(previous) => timestamp - previous,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);
        self.update(elapsed);
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused && !paused {
            self.last_timestamp = None;
        }
        if self.paused != paused {
            tracing::debug!(paused, "Simulation pause state changed");
        }
        self.paused = paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Scales every source uniformly; clamped to the configured speed range.
    pub fn set_global_speed(&mut self, speed: f64) {
        if speed.is_nan() {
            return;
        }
        self.global_speed = speed.clamp(self.settings.speed_min, self.settings.speed_max);
    }

    #[must_use]
    pub fn global_speed(&self) -> f64 {
        self.global_speed
    }

    pub fn set_randomness_factor(&mut self, factor: f64) {
        self.grid.set_randomness_factor(factor);
    }

    /// Places a source at `(x, y)`. Returns its index, or `None` when off-grid.
    pub fn add_source(&mut self, x: usize, y: usize, rate: f64) -> Option<usize> {
        let size = self.grid.size();
        if x >= size || y >= size {
            return None;
        }
        self.sources.push(SandSource::new(x, y, rate));
        tracing::debug!(x, y, rate, "Source added");
        Some(self.sources.len() - 1)
    }

    /// Places a source at a random position away from the border, with a
    /// random rate from the configured range.
    pub fn add_random_source(&mut self) -> usize {
        let size = self.grid.size();
        let margin = self.settings.edge_margin;
        let (low, high) = if size > 2 * margin {
            (margin, size - margin)
        } else {
            (0, size)
        };
        let x = self.rng.gen_range(low..high);
        let y = self.rng.gen_range(low..high);
        let rate = if self.settings.rate_max > self.settings.rate_min {
            self.rng
                .gen_range(self.settings.rate_min..=self.settings.rate_max)
        } else {
            self.settings.rate_min
        };
        self.sources.push(SandSource::new(x, y, rate));
        tracing::debug!(x, y, rate, "Random source added");
        self.sources.len() - 1
    }

    /// Removes the source at `index`, or the newest one when `index` is `None`.
    pub fn remove_source(&mut self, index: Option<usize>) -> Option<SandSource> {
        let index = index.unwrap_or_else(|| self.sources.len().saturating_sub(1));
        if index >= self.sources.len() {
            return None;
        }
        let removed = self.sources.remove(index);
        tracing::debug!(index, "Source removed");
        Some(removed)
    }

    pub fn set_source_rate(&mut self, index: usize, rate: f64) -> bool {
        match self.sources.get_mut(index) {
            Some(source) => {
                source.set_rate(rate);
                true
            }
            None => false,
        }
    }

    pub fn set_source_active(&mut self, index: usize, active: bool) -> bool {
        match self.sources.get_mut(index) {
            Some(source) => {
                source.active = active;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get_source_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn sources(&self) -> &[SandSource] {
        &self.sources
    }

    #[must_use]
    pub fn grid(&self) -> &SandpileGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut SandpileGrid {
        &mut self.grid
    }

    #[must_use]
    pub fn statistics(&self) -> SimulationStatistics {
        SimulationStatistics {
            grid: self.grid.get_statistics(),
            source_count: self.sources.len(),
            total_emitted: self.total_emitted,
            ticks: self.ticks,
        }
    }

    /// Empties the grid and the sources' carry. Sources themselves stay.
    pub fn reset(&mut self) {
        self.grid.reset();
        for source in &mut self.sources {
            source.clear_pending();
        }
        self.total_emitted = 0;
        self.ticks = 0;
        self.last_timestamp = None;
    }

    #[must_use]
    pub fn export_state(&self) -> ExportedState {
        ExportedState {
            grid_size: self.grid.size(),
            grid: self.grid.get_grid_copy(),
            sources: self.sources.iter().map(SandSource::to_record).collect(),
            global_speed: self.global_speed,
            statistics: self.statistics(),
        }
    }

    /// Replaces grid, sources and speed with `state`.
    ///
    /// The state is validated before anything changes; on error the current
    /// simulation is left untouched.
    pub fn import_state(&mut self, state: &ExportedState) -> Result<()> {
        if let Err(e) = validate_state(state) {
            tracing::warn!(error = %e, "Rejected state import");
            return Err(e);
        }

        if state.grid_size != self.grid.size() {
            let mut grid =
                SandpileGrid::new(state.grid_size, self.grid.critical_mass(), self.rng.gen())?;
            grid.set_randomness_factor(self.grid.get_randomness_factor());
            self.grid = grid;
        }
        self.reset();

        for (x, column) in state.grid.iter().enumerate() {
            for (y, &height) in column.iter().enumerate() {
                if height > 0 {
                    self.grid.add_sand(x as i64, y as i64, height);
                }
            }
        }
        self.sources = state.sources.iter().map(SandSource::from).collect();
        self.set_global_speed(state.global_speed);

        tracing::debug!(
            size = state.grid_size,
            sources = self.sources.len(),
            "State imported"
        );
        Ok(())
    }
}

fn validate_state(state: &ExportedState) -> Result<()> {
    let size = state.grid_size;
    if size == 0 {
        return Err(CoreError::InvalidGridSize(0));
    }
    if state.grid.len() != size {
        return Err(CoreError::invalid_state(format!(
            "grid has {} columns, expected {size}",
            state.grid.len()
        )));
    }
    if let Some(x) = state.grid.iter().position(|column| column.len() != size) {
        return Err(CoreError::invalid_state(format!(
            "grid column {x} has {} cells, expected {size}",
            state.grid[x].len()
        )));
    }
    for (i, source) in state.sources.iter().enumerate() {
        if source.grid_x >= size || source.grid_y >= size {
            return Err(CoreError::invalid_state(format!(
                "source {i} at ({}, {}) lies outside a {size}x{size} grid",
                source.grid_x, source.grid_y
            )));
        }
    }
    Ok(())
}
