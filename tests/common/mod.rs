pub mod macros;

use sandpulse_core::config::SourceConfig;
use sandpulse_core::{SandpileGrid, SimConfig, Simulation};

#[allow(dead_code)]
pub struct SimulationBuilder {
    config: SimConfig,
    sources: Vec<(usize, usize, f64)>,
    sand: Vec<(i64, i64, u32)>,
}

#[allow(dead_code)]
impl SimulationBuilder {
    pub fn new() -> Self {
        let mut config = SimConfig::default();
        config.grid.size = 16;
        config.grid.seed = Some(0);
        config.sources.initial_count = 0;
        Self {
            config,
            sources: Vec::new(),
            sand: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.grid.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.config.grid.size = size;
        self
    }

    pub fn with_randomness(mut self, randomness: f64) -> Self {
        self.config.grid.randomness = randomness;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut SimConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_source(mut self, x: usize, y: usize, rate: f64) -> Self {
        self.sources.push((x, y, rate));
        self
    }

    pub fn with_sand(mut self, x: i64, y: i64, amount: u32) -> Self {
        self.sand.push((x, y, amount));
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn build(self) -> Simulation {
        let mut sim = Simulation::from_config(&self.config).expect("Failed to build simulation");
        for (x, y, rate) in self.sources {
            sim.add_source(x, y, rate).expect("Source outside the grid");
        }
        for (x, y, amount) in self.sand {
            sim.grid_mut().add_sand(x, y, amount);
        }
        sim
    }

    pub fn build_grid(self) -> SandpileGrid {
        let mut grid = SandpileGrid::new(
            self.config.grid.size,
            self.config.grid.critical_mass,
            self.config.grid.seed.unwrap_or(0),
        )
        .expect("Failed to build grid");
        grid.set_randomness_factor(self.config.grid.randomness);
        for (x, y, amount) in self.sand {
            grid.add_sand(x, y, amount);
        }
        grid
    }
}

#[allow(dead_code)]
pub fn quiet_sources() -> SourceConfig {
    SourceConfig {
        initial_count: 0,
        ..SourceConfig::default()
    }
}
