use thiserror::Error;

/// Errors raised by the reconstruction stages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Not enough samples for {what}: need at least {needed}, found {found}")]
    InsufficientSamples {
        what: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("Timestamps out of order at index {index} ({previous} -> {current})")]
    NonMonotonicTimestamps {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Non-finite value in {what} at index {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("Singular parabola fit at sample {index}: duplicate timestamps")]
    SingularFit { index: usize },

    #[error("No stationary interval found (speed threshold up to {max_threshold} m/s)")]
    NoStationaryReference { max_threshold: f64 },

    #[error("{stage} requires at least one stationary interval")]
    MissingStationaryInterval { stage: &'static str },

    #[error("Stationary interval {start}..{end} outside series of length {len}")]
    IntervalOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Neither GNSS fixes nor a speed series were supplied")]
    MissingSpeedReference,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for the reconstruction pipeline
pub type FusionResult<T> = Result<T, FusionError>;

/// Fails with `LengthMismatch` unless `found == expected`.
pub(crate) fn ensure_len(what: &'static str, expected: usize, found: usize) -> FusionResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(FusionError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}
