use super::grid::SimulationStatistics;
use serde::{Deserialize, Serialize};

/// One emission point as persisted by hosts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub grid_x: usize,
    pub grid_y: usize,
    pub sand_rate: f64,
    pub active: bool,
}

/// Full simulation snapshot handed to and accepted from persistence layers.
///
/// `grid[x][y]` is the height at column `x`, row `y`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedState {
    pub grid_size: usize,
    pub grid: Vec<Vec<u32>>,
    pub sources: Vec<SourceRecord>,
    pub global_speed: f64,
    #[serde(default)]
    pub statistics: SimulationStatistics,
}

impl ExportedState {
    /// Sum of all heights in the snapshot.
    #[must_use]
    pub fn total_sand(&self) -> u64 {
        self.grid
            .iter()
            .flat_map(|column| column.iter())
            .map(|&h| u64::from(h))
            .sum()
    }
}
