/// Asserts that the grid's cell sum matches its `total_sand` counter.
#[macro_export]
macro_rules! assert_conserved {
    ($grid:expr) => {
        let sum: u64 = $grid.cells().iter().map(|&h| u64::from(h)).sum();
        assert_eq!(
            sum,
            $grid.get_statistics().total_sand,
            "Cell sum diverged from the running total"
        );
    };
    ($grid:expr, $expected:expr) => {
        let sum: u64 = $grid.cells().iter().map(|&h| u64::from(h)).sum();
        assert_eq!(sum, $expected, "Unexpected amount of sand on the grid");
        assert_eq!($grid.get_statistics().total_sand, $expected);
    };
}

/// Asserts that no cell is at or above critical mass.
#[macro_export]
macro_rules! assert_stable {
    ($grid:expr) => {
        assert!($grid.is_stable(), "Grid still has unstable cells");
        let critical = $grid.critical_mass();
        if let Some(h) = $grid.cells().iter().find(|&&h| h >= critical) {
            panic!("Cell at height {} is not below critical mass {}", h, critical);
        }
    };
}
