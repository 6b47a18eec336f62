//! Common data types for xrstat

use serde::{Deserialize, Serialize};

/// Equally-weighted posterior sample set produced from a nested-sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSamples {
    /// Resampled parameter vectors (one row per draw).
    pub samples: Vec<Vec<f64>>,

    /// Log-likelihood of each resampled draw.
    pub log_likelihoods: Vec<f64>,

    /// Joint log-probability (log-likelihood + log-prior) of each draw.
    pub log_probabilities: Vec<f64>,

    /// Log-evidence trace of the run, converted to base 10.
    pub log_evidence_base10: Vec<f64>,
}

impl PosteriorSamples {
    /// Number of posterior draws.
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Dimensionality of the parameter space (0 for an empty sample set).
    pub fn dim(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }
}
