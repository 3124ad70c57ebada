use serde::{Deserialize, Serialize};

/// Running counters of the sandpile grid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridStatistics {
    /// Grains currently on the grid (injected minus lost over the open boundary).
    pub total_sand: u64,
    /// Relaxation passes in which at least one cell toppled.
    pub total_avalanches: u64,
    /// Topples performed by the most recent non-empty pass.
    pub last_avalanche_size: u64,
    /// Individual cell topples since the last reset.
    pub total_topples: u64,
    /// Cells at or above critical mass right now.
    pub unstable_count: usize,
}

/// Controller-level view: grid counters plus emission bookkeeping.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatistics {
    #[serde(flatten)]
    pub grid: GridStatistics,
    pub source_count: usize,
    pub total_emitted: u64,
    pub ticks: u64,
}
