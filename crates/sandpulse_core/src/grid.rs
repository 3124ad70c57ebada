//! Stochastic Abelian sandpile grid.
//!
//! Heights live in a flat vector indexed `x * size + y`. Unstable cells are
//! tracked with a dense membership array plus an index work queue, so a
//! relaxation pass never allocates.

use crate::error::{CoreError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandpulse_data::GridStatistics;

/// Classic BTW threshold.
pub const DEFAULT_CRITICAL_MASS: u32 = 4;

/// Pass cap used by [`SandpileGrid::stabilize_default`].
pub const DEFAULT_STABILIZE_ITERATIONS: usize = 10_000;

const NEIGHBOR_OFFSETS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Jitter radius is `ceil(2r)` with `r <= 1`.
const MAX_JITTER_RADIUS: i64 = 2;
const JITTER_CAPACITY: usize =
    ((2 * MAX_JITTER_RADIUS + 1) * (2 * MAX_JITTER_RADIUS + 1)) as usize;

/// Reusable candidate list for jitter redistribution.
#[derive(Debug, Clone)]
struct JitterScratch {
    cells: [usize; JITTER_CAPACITY],
    weights: [f64; JITTER_CAPACITY],
    len: usize,
}

impl JitterScratch {
    fn new() -> Self {
        Self {
            cells: [0; JITTER_CAPACITY],
            weights: [0.0; JITTER_CAPACITY],
            len: 0,
        }
    }

    fn clear(&mut self) {
        self.len = 0;
    }

    fn push(&mut self, idx: usize, weight: f64) {
        if self.len < JITTER_CAPACITY {
            self.cells[self.len] = idx;
            self.weights[self.len] = weight;
            self.len += 1;
        }
    }

    fn total_weight(&self) -> f64 {
        self.weights[..self.len].iter().sum()
    }
}

/// Square sandpile with open boundaries and an optional stochastic spread.
///
/// # Examples
/// ```
/// use sandpulse_core::grid::SandpileGrid;
///
/// let mut grid = SandpileGrid::new(8, 4, 7).unwrap();
/// grid.add_sand(4, 4, 4);
/// assert!(grid.process_avalanches());
/// assert_eq!(grid.get_sand(4, 4), 0);
/// assert_eq!(grid.get_sand(5, 4), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SandpileGrid {
    size: usize,
    critical_mass: u32,
    cells: Vec<u32>,
    unstable: Vec<usize>,
    queued: Vec<bool>,
    work: Vec<usize>,
    scratch: JitterScratch,
    randomness: f64,
    rng: ChaCha8Rng,
    total_sand: u64,
    total_avalanches: u64,
    last_avalanche_size: u64,
    total_topples: u64,
}

impl SandpileGrid {
    /// Creates an empty `size` x `size` grid.
    ///
    /// `seed` drives jitter draws only; at randomness 0 it is never consulted.
    pub fn new(size: usize, critical_mass: u32, seed: u64) -> Result<Self> {
        if size == 0 {
            return Err(CoreError::InvalidGridSize(size));
        }
        if critical_mass < 4 {
            return Err(CoreError::InvalidCriticalMass(critical_mass));
        }
        let area = size * size;
        Ok(Self {
            size,
            critical_mass,
            cells: vec![0; area],
            unstable: Vec::with_capacity(area),
            queued: vec![false; area],
            work: Vec::with_capacity(area),
            scratch: JitterScratch::new(),
            randomness: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            total_sand: 0,
            total_avalanches: 0,
            last_avalanche_size: 0,
            total_topples: 0,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn critical_mass(&self) -> u32 {
        self.critical_mass
    }

    /// Flat snapshot, index `x * size + y`.
    #[must_use]
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    #[inline(always)]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let n = self.size as i64;
        if x >= 0 && x < n && y >= 0 && y < n {
            Some(x as usize * self.size + y as usize)
        } else {
            None
        }
    }

    #[inline(always)]
    fn enqueue_if_unstable(&mut self, idx: usize) {
        if self.cells[idx] >= self.critical_mass && !self.queued[idx] {
            self.queued[idx] = true;
            self.unstable.push(idx);
        }
    }

    /// Raises a cell by as much of `amount` as fits and returns the overflow.
    #[inline(always)]
    fn fill(&mut self, idx: usize, amount: u32) -> u32 {
        let fitted = amount.min(u32::MAX - self.cells[idx]);
        self.cells[idx] += fitted;
        amount - fitted
    }

    /// Drops grains on a cell. Off-grid coordinates are ignored, and grains
    /// that would push the cell past `u32::MAX` are never counted.
    pub fn add_sand(&mut self, x: i64, y: i64, amount: u32) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let overflow = self.fill(idx, amount);
        self.total_sand += u64::from(amount - overflow);
        self.enqueue_if_unstable(idx);
    }

    /// Height at a cell, zero when off-grid.
    #[must_use]
    pub fn get_sand(&self, x: i64, y: i64) -> u32 {
        self.index(x, y).map_or(0, |idx| self.cells[idx])
    }

    /// Runs one relaxation pass over the current unstable set.
    ///
    /// Returns whether any cell toppled.
    pub fn process_avalanches(&mut self) -> bool {
        if self.unstable.is_empty() {
            return false;
        }

        let mut work = std::mem::take(&mut self.work);
        std::mem::swap(&mut work, &mut self.unstable);
        for &idx in &work {
            self.queued[idx] = false;
        }

        let mut topples = 0u64;
        for &idx in &work {
            let height = self.cells[idx];
            if height < self.critical_mass {
                continue;
            }
            let share = height / 4;
            self.cells[idx] = height % 4;
            topples += 1;

            let x = (idx / self.size) as i64;
            let y = (idx % self.size) as i64;
            for (dx, dy) in NEIGHBOR_OFFSETS {
                self.distribute(x + dx, y + dy, share);
            }
            self.enqueue_if_unstable(idx);
        }

        work.clear();
        self.work = work;
        self.prune_unstable();

        if topples > 0 {
            self.total_avalanches += 1;
            self.last_avalanche_size = topples;
            self.total_topples += topples;
        }
        topples > 0
    }

    /// Relaxes until stable or `max_iterations` passes have run.
    ///
    /// Hitting the cap is not an error; check [`Self::is_stable`] afterwards.
    pub fn stabilize(&mut self, max_iterations: usize) -> usize {
        let mut iterations = 0;
        while iterations < max_iterations && !self.unstable.is_empty() {
            self.process_avalanches();
            iterations += 1;
        }
        iterations
    }

    pub fn stabilize_default(&mut self) -> usize {
        self.stabilize(DEFAULT_STABILIZE_ITERATIONS)
    }

    /// Hands one neighbor its share, splitting off jitter when randomness is on.
    fn distribute(&mut self, nx: i64, ny: i64, share: u32) {
        if share == 0 {
            return;
        }
        if self.randomness <= 0.0 {
            self.deposit_or_discard(nx, ny, share);
            return;
        }

        let draw: f64 = self.rng.gen();
        let jitter = ((f64::from(share) * self.randomness * draw).floor() as u32).min(share);
        self.deposit_or_discard(nx, ny, share - jitter);
        if jitter > 0 {
            self.scatter(nx, ny, jitter);
        }
    }

    fn deposit_or_discard(&mut self, x: i64, y: i64, amount: u32) {
        if amount == 0 {
            return;
        }
        match self.index(x, y) {
            Some(idx) => {
                let overflow = self.fill(idx, amount);
                self.lose(overflow);
                self.enqueue_if_unstable(idx);
            }
            None => self.lose(amount),
        }
    }

    /// Spreads `amount` over in-range cells around `(cx, cy)`, weighted by
    /// `1 / (1 + distance)`. The rounding remainder lands on one random
    /// candidate.
    fn scatter(&mut self, cx: i64, cy: i64, amount: u32) {
        let radius = ((2.0 * self.randomness).ceil() as i64).clamp(1, MAX_JITTER_RADIUS);

        self.scratch.clear();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let distance = ((dx * dx + dy * dy) as f64).sqrt();
                if distance > radius as f64 {
                    continue;
                }
                if let Some(idx) = self.index(cx + dx, cy + dy) {
                    self.scratch.push(idx, 1.0 / (1.0 + distance));
                }
            }
        }

        if self.scratch.len == 0 {
            self.lose(amount);
            return;
        }

        let total_weight = self.scratch.total_weight();
        let mut placed = 0u32;
        for i in 0..self.scratch.len {
            let portion = (f64::from(amount) * self.scratch.weights[i] / total_weight).floor() as u32;
            let portion = portion.min(amount - placed);
            let overflow = self.fill(self.scratch.cells[i], portion);
            self.lose(overflow);
            placed += portion;
        }

        let remainder = amount - placed;
        if remainder > 0 {
            let pick = self.rng.gen_range(0..self.scratch.len);
            let overflow = self.fill(self.scratch.cells[pick], remainder);
            self.lose(overflow);
        }

        for i in 0..self.scratch.len {
            self.enqueue_if_unstable(self.scratch.cells[i]);
        }
    }

    #[inline(always)]
    fn lose(&mut self, amount: u32) {
        self.total_sand = self.total_sand.saturating_sub(u64::from(amount));
    }

    fn prune_unstable(&mut self) {
        let cells = &self.cells;
        let queued = &mut self.queued;
        let critical = self.critical_mass;
        self.unstable.retain(|&idx| {
            let keep = cells[idx] >= critical;
            if !keep {
                queued[idx] = false;
            }
            keep
        });
    }

    /// Heights as `grid[x][y]`. The copy is detached from the engine.
    #[must_use]
    pub fn get_grid_copy(&self) -> Vec<Vec<u32>> {
        self.cells
            .chunks(self.size)
            .map(<[u32]>::to_vec)
            .collect()
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.unstable.is_empty()
    }

    #[must_use]
    pub fn unstable_count(&self) -> usize {
        self.unstable.len()
    }

    #[must_use]
    pub fn get_max_height(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn get_statistics(&self) -> GridStatistics {
        GridStatistics {
            total_sand: self.total_sand,
            total_avalanches: self.total_avalanches,
            last_avalanche_size: self.last_avalanche_size,
            total_topples: self.total_topples,
            unstable_count: self.unstable.len(),
        }
    }

    /// Sets the jitter strength, clamped to `[0, 1]`. NaN disables jitter.
    pub fn set_randomness_factor(&mut self, factor: f64) {
        self.randomness = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
    }

    #[must_use]
    pub fn get_randomness_factor(&self) -> f64 {
        self.randomness
    }

    /// Clears all heights, the unstable set and every counter.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.queued.fill(false);
        self.unstable.clear();
        self.work.clear();
        self.total_sand = 0;
        self.total_avalanches = 0;
        self.last_avalanche_size = 0;
        self.total_topples = 0;
    }
}
