//! Plain data shapes exchanged between the sandpulse core and its hosts.
//!
//! Nothing here owns behaviour: these are the records a renderer, UI or
//! persistence layer reads from or hands back to the engine.

pub mod data;

pub use data::grid::{GridStatistics, SimulationStatistics};
pub use data::signal::{SignalParameters, SignalStatistics};
pub use data::spectrum::{SpectralPeak, Spectrum};
pub use data::state::{ExportedState, SourceRecord};
