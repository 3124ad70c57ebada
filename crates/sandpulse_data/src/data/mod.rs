//! Core data structures for the sandpulse pipeline.

pub mod grid;
pub mod signal;
pub mod spectrum;
pub mod state;
