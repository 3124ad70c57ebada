//! Error types for sandpulse_core.
//!
//! Only configuration mistakes and input contract violations surface here.
//! Out-of-range coordinates, boundary losses and relaxation caps are absorbed
//! by the engine and show up in statistics instead.

use thiserror::Error;

/// Main error type for core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Spectral transform length is not a power of two (or is below 2).
    #[error("Transform size {0} is not a power of two >= 2")]
    InvalidTransformSize(usize),

    /// Signal handed to the spectral analyzer has the wrong length.
    #[error("Signal length mismatch: expected {expected}, got {actual}")]
    SignalLength { expected: usize, actual: usize },

    /// Critical mass too small for a four-way split to ever relax.
    #[error("Critical mass {0} must be at least 4")]
    InvalidCriticalMass(u32),

    /// Grid side length of zero.
    #[error("Grid size must be positive, got {0}")]
    InvalidGridSize(usize),

    /// Signal buffer with no room for samples.
    #[error("Signal buffer size must be positive, got {0}")]
    InvalidBufferSize(usize),

    /// Grid snapshot handed to the signal deriver has the wrong cell count.
    #[error("Snapshot size mismatch: expected {expected} cells, got {actual}")]
    SnapshotSize { expected: usize, actual: usize },

    /// Imported state does not describe a consistent simulation.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Creates a new invalid state error.
    #[must_use]
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Creates a new signal length error.
    #[must_use]
    pub fn signal_length(expected: usize, actual: usize) -> Self {
        Self::SignalLength { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidTransformSize(12);
        assert_eq!(err.to_string(), "Transform size 12 is not a power of two >= 2");
    }

    #[test]
    fn test_signal_length_display() {
        let err = CoreError::signal_length(8, 5);
        assert!(err.to_string().contains("expected 8, got 5"));
    }

    #[test]
    fn test_invalid_state_helper() {
        let err = CoreError::invalid_state("ragged grid");
        assert!(matches!(err, CoreError::InvalidState(ref m) if m == "ragged grid"));
    }
}
