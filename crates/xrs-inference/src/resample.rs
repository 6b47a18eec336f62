//! Systematic resampling of weighted nested-sampling draws.
//!
//! A nested-sampling run emits draws with importance weights
//! `exp(logwt - logz_final)`. Downstream consumers need an
//! equally-weighted posterior set, produced here with the standard
//! low-variance systematic scheme: N evenly spaced positions, offset by
//! one uniform draw, walked against the cumulative weight sum in a
//! single forward pass.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xrs_core::{Error, LogPrior, PosteriorSamples, Result};

/// Raw output of one nested-sampling run.
///
/// `samples`, `log_weights`, and `log_likelihoods` are per-draw and must
/// have equal lengths; `log_evidence` is the evidence trace over the run,
/// whose final entry normalizes the weights.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedRun {
    /// Parameter vectors, one per draw.
    pub samples: Vec<Vec<f64>>,
    /// Log importance weight of each draw (`logwt`).
    pub log_weights: Vec<f64>,
    /// Log-likelihood of each draw (`logl`).
    pub log_likelihoods: Vec<f64>,
    /// Log-evidence trace (`logz`); the last entry is the run total.
    pub log_evidence: Vec<f64>,
}

impl NestedRun {
    fn validate(&self) -> Result<()> {
        let n = self.samples.len();
        if n == 0 {
            return Err(Error::Validation("nested run has no samples".to_string()));
        }
        if self.log_weights.len() != n || self.log_likelihoods.len() != n {
            return Err(Error::Validation(format!(
                "nested run length mismatch: {} samples, {} log-weights, {} log-likelihoods",
                n,
                self.log_weights.len(),
                self.log_likelihoods.len()
            )));
        }
        if self.log_evidence.is_empty() {
            return Err(Error::Validation("nested run has an empty log-evidence trace".to_string()));
        }
        Ok(())
    }
}

/// Importance weights normalized by the final log-evidence.
///
/// The weights of a correctly-normalized run sum to 1; a deviation
/// beyond `sqrt(machine epsilon)` means the upstream evidence is wrong,
/// and resampling it would silently bias the posterior. That case is a
/// hard [`Error::WeightNormalization`] failure, raised before any
/// resampling work.
fn normalized_weights(log_weights: &[f64], log_evidence_final: f64) -> Result<Vec<f64>> {
    let weights: Vec<f64> =
        log_weights.iter().map(|lw| (lw - log_evidence_final).exp()).collect();
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > f64::EPSILON.sqrt() {
        return Err(Error::WeightNormalization { sum });
    }
    Ok(weights)
}

/// Systematic resampling index assignment.
///
/// For `N` weights and positions `p_i = (offset + i) / N`, index `i`
/// receives the first cursor `j` whose cumulative weight exceeds `p_i`.
/// Both arrays are visited once, in order, with no backtracking; the
/// cursor is clamped to the last weight so a slightly deficient
/// cumulative sum cannot run past the end. `offset` must lie in `[0, 1)`
/// and `weights` must be normalized (see [`resample_posterior`] for the
/// checked entry point).
pub fn systematic_indices(weights: &[f64], offset: f64) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let mut indices = Vec::with_capacity(n);
    let mut j = 0usize;
    let mut cumulative = weights[0];
    for i in 0..n {
        let position = (offset + i as f64) / n as f64;
        while position >= cumulative && j < n - 1 {
            j += 1;
            cumulative += weights[j];
        }
        indices.push(j);
    }
    indices
}

/// Resample weighted draws into an equally-weighted sample set.
///
/// The offset is drawn from a `StdRng` seeded with `seed`, so results are
/// reproducible and independent of any process-global state.
pub fn resample_equal(
    samples: &[Vec<f64>],
    log_weights: &[f64],
    log_evidence_final: f64,
    seed: u64,
) -> Result<Vec<Vec<f64>>> {
    if samples.len() != log_weights.len() {
        return Err(Error::Validation(format!(
            "resample_equal length mismatch: {} samples, {} log-weights",
            samples.len(),
            log_weights.len()
        )));
    }
    let weights = normalized_weights(log_weights, log_evidence_final)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let offset: f64 = rng.random();
    Ok(systematic_indices(&weights, offset)
        .into_iter()
        .map(|i| samples[i].clone())
        .collect())
}

/// Resample a nested-sampling run and recompute joint log-probabilities.
///
/// Gathers samples and log-likelihoods through the systematic index
/// sequence, evaluates `prior` on each resampled draw to form
/// `log_likelihood + log_prior`, and converts the evidence trace to
/// base 10.
pub fn resample_posterior(
    run: &NestedRun,
    prior: &impl LogPrior,
    seed: u64,
) -> Result<PosteriorSamples> {
    run.validate()?;
    let log_evidence_final = run.log_evidence[run.log_evidence.len() - 1];
    let weights = normalized_weights(&run.log_weights, log_evidence_final)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let offset: f64 = rng.random();
    let indices = systematic_indices(&weights, offset);

    let samples: Vec<Vec<f64>> = indices.iter().map(|&i| run.samples[i].clone()).collect();
    let log_likelihoods: Vec<f64> = indices.iter().map(|&i| run.log_likelihoods[i]).collect();
    let log_probabilities: Vec<f64> = samples
        .iter()
        .zip(&log_likelihoods)
        .map(|(s, ll)| ll + prior.log_prior(s))
        .collect();
    let log_evidence_base10: Vec<f64> =
        run.log_evidence.iter().map(|z| z / std::f64::consts::LN_10).collect();

    Ok(PosteriorSamples { samples, log_likelihoods, log_probabilities, log_evidence_base10 })
}
