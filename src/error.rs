//! Error types shared by every part of the crate.

use thiserror::Error;

/// Failures surfaced by network construction, training and encoding.
///
/// Arithmetic problems (overflow, NaN) are not reported here; they propagate
/// through the numbers like any other value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Two buffers that must agree in shape do not.
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// A batch already holds as many pairs as it was built for.
    #[error("batch full: capacity is {capacity} pairs")]
    BatchFull { capacity: usize },

    /// A forward pass was given more rows than the layers were sized for.
    #[error("batch of {rows} rows exceeds the configured maximum of {max}")]
    BatchTooLarge { rows: usize, max: usize },

    #[error("no training data has been set")]
    MissingTrainingData,

    #[error("network weights have not been initialized")]
    NotInitialized,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A categorical value outside the encoder's vocabulary.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A decoder tried to read past the end of its input vector.
    #[error("decoder needs {needed} values but only {available} remain")]
    EncodingOverrun { needed: usize, available: usize },

    #[error("no observations recorded")]
    NoObservations,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns a `DimensionMismatch` unless `expected == found`.
pub(crate) fn check_dim(
    context: &'static str,
    expected: usize,
    found: usize,
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            context,
            expected,
            found,
        })
    }
}
