//! # Sandpulse Core
//!
//! A real-time stochastic sandpile coupled to a signal and spectrum pipeline.
//!
//! This crate contains the deterministic-by-seed simulation logic:
//! - Abelian sandpile with open boundaries and tunable jitter
//! - Emission sources and tick-bounded avalanche relaxation
//! - Distance-weighted activity signal with a circular sample buffer
//! - Hamming-windowed radix-2 FFT with spectral smoothing
//!
//! ## Example
//!
//! ```
//! use sandpulse_core::grid::SandpileGrid;
//! use sandpulse_core::signal::SignalDeriver;
//! use sandpulse_core::spectral::SpectralAnalyzer;
//!
//! let mut grid = SandpileGrid::new(16, 4, 42).unwrap();
//! let mut signal = SignalDeriver::new(16, 64, 30.0, 42).unwrap();
//! let mut analyzer = SpectralAnalyzer::new(32, 30.0).unwrap();
//!
//! for step in 0..64 {
//!     grid.add_sand(8, 8, 1 + step % 3);
//!     grid.stabilize(5);
//!     signal.update(grid.cells()).unwrap();
//! }
//!
//! let spectrum = analyzer.process(&signal.get_signal_data(32)).unwrap();
//! assert_eq!(spectrum.bins(), 17);
//! ```

/// Configuration management for simulation parameters
pub mod config;
/// Error types for construction and input contract violations
pub mod error;
/// Sandpile grid engine with stochastic topple redistribution
pub mod grid;
/// Tick metrics collection and logging setup
pub mod metrics;
/// Activity signal derivation and circular sample buffer
pub mod signal;
/// Simulation controller driving sources and bounded relaxation
pub mod simulation;
/// Emission points with fractional carry
pub mod source;
/// Windowed FFT and spectrum post-processing
pub mod spectral;

pub use config::SimConfig;
pub use error::{CoreError, Result};
pub use grid::SandpileGrid;
pub use metrics::{init_logging, TickMetrics};
pub use signal::{SignalBuffer, SignalDeriver};
pub use simulation::Simulation;
pub use source::SandSource;
pub use spectral::SpectralAnalyzer;
