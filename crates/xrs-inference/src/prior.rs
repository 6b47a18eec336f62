//! Per-parameter priors for posterior post-processing.

use xrs_core::LogPrior;

/// Prior distribution for a single parameter.
#[derive(Debug, Clone)]
pub enum Prior {
    /// Flat (improper) prior — contributes 0 to the log-probability.
    Flat,
    /// Normal prior: `log p(x) = -0.5 * ((x - center) / width)^2 + const`.
    Normal {
        /// Center of the Gaussian prior.
        center: f64,
        /// Width (standard deviation) of the Gaussian prior.
        width: f64,
    },
}

impl Prior {
    /// Log density at `x`, up to an additive constant.
    pub fn logpdf(&self, x: f64) -> f64 {
        match self {
            Prior::Flat => 0.0,
            Prior::Normal { center, width } => {
                let pull = (x - center) / width;
                -0.5 * pull * pull
            }
        }
    }
}

/// Independent per-parameter priors over a parameter vector.
#[derive(Debug, Clone)]
pub struct IndependentPriors {
    priors: Vec<Prior>,
}

impl IndependentPriors {
    /// One prior per parameter, in parameter order.
    pub fn new(priors: Vec<Prior>) -> Self {
        Self { priors }
    }

    /// Number of parameters covered.
    pub fn dim(&self) -> usize {
        self.priors.len()
    }
}

impl LogPrior for IndependentPriors {
    fn log_prior(&self, theta: &[f64]) -> f64 {
        assert_eq!(theta.len(), self.priors.len());
        theta.iter().zip(&self.priors).map(|(&x, p)| p.logpdf(x)).sum()
    }
}
