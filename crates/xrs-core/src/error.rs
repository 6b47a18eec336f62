//! Error types for xrstat

use thiserror::Error;

/// xrstat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Posterior weights handed to the resampler are not normalized.
    #[error("posterior weights sum to {sum}, not 1")]
    WeightNormalization {
        /// Actual sum of the normalized weights.
        sum: f64,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
