//! Sandpulse: a stochastic sandpile whose avalanche activity is turned into
//! a sampled signal and analysed spectrally.
//!
//! The simulation, signal and spectral building blocks live in
//! `sandpulse_core`; this crate wires them into a fixed-step pipeline and
//! the runners used by the binary.

pub mod app;
