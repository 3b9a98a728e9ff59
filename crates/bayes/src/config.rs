//! Configuration for posterior sampling.

use crate::error::BayesError;

/// Configuration for [`crate::sample_posterior`].
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use msm_bayes::BayesConfig;
///
/// let config = BayesConfig::new(200)
///     .with_seed(7)
///     .with_burn_in(1000)
///     .with_thin(10)
///     .with_chains(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BayesConfig {
    n_samples: usize,
    prior: f64,
    seed: u64,
    burn_in: usize,
    thin: usize,
    chains: usize,
    step_scale: f64,
}

impl BayesConfig {
    /// Creates a configuration drawing `n_samples` matrices.
    ///
    /// Defaults: `prior = 0.0`, `seed = 42`, `burn_in = 500`, `thin = 5`,
    /// `chains = 1`, `step_scale = 1.0`.
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            prior: 0.0,
            seed: 42,
            burn_in: 500,
            thin: 5,
            chains: 1,
            step_scale: 1.0,
        }
    }

    /// Sets the total number of recorded samples.
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Sets the pseudo-count added to every entry of the sparsity pattern.
    pub fn with_prior(mut self, prior: f64) -> Self {
        self.prior = prior;
        self
    }

    /// Sets the base random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of discarded sweeps per chain.
    pub fn with_burn_in(mut self, burn_in: usize) -> Self {
        self.burn_in = burn_in;
        self
    }

    /// Sets the number of sweeps between recorded samples.
    pub fn with_thin(mut self, thin: usize) -> Self {
        self.thin = thin;
        self
    }

    /// Sets the number of independent chains.
    pub fn with_chains(mut self, chains: usize) -> Self {
        self.chains = chains;
        self
    }

    /// Sets the multiplier on the random-walk proposal widths.
    pub fn with_step_scale(mut self, step_scale: f64) -> Self {
        self.step_scale = step_scale;
        self
    }

    // --- Accessors ---

    /// Total number of recorded samples.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Pseudo-count added to every pattern entry.
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Base random seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Discarded sweeps per chain.
    pub fn burn_in(&self) -> usize {
        self.burn_in
    }

    /// Sweeps between recorded samples.
    pub fn thin(&self) -> usize {
        self.thin
    }

    /// Number of chains.
    pub fn chains(&self) -> usize {
        self.chains
    }

    /// Proposal width multiplier.
    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    /// Number of samples drawn by `chain`. Earlier chains take the remainder.
    pub fn samples_for_chain(&self, chain: usize) -> usize {
        let base = self.n_samples / self.chains;
        base + usize::from(chain < self.n_samples % self.chains)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BayesError::InvalidConfig`] if `n_samples`, `thin` or
    /// `chains` is zero, `chains > n_samples`, the prior is negative or
    /// not finite, or the step scale is not positive.
    pub fn validate(&self) -> Result<(), BayesError> {
        let fail = |reason: String| Err(BayesError::InvalidConfig { reason });
        if self.n_samples == 0 {
            return fail("n_samples must be >= 1".to_string());
        }
        if self.thin == 0 {
            return fail("thin must be >= 1".to_string());
        }
        if self.chains == 0 || self.chains > self.n_samples {
            return fail(format!(
                "chains must be in 1..={}, got {}",
                self.n_samples, self.chains
            ));
        }
        if !(self.prior.is_finite() && self.prior >= 0.0) {
            return fail(format!("prior must be finite and >= 0, got {}", self.prior));
        }
        if !(self.step_scale.is_finite() && self.step_scale > 0.0) {
            return fail(format!(
                "step_scale must be finite and positive, got {}",
                self.step_scale
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = BayesConfig::new(100);
        assert_eq!(c.n_samples(), 100);
        assert_eq!(c.burn_in(), 500);
        assert_eq!(c.thin(), 5);
        assert_eq!(c.chains(), 1);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn samples_split_across_chains() {
        let c = BayesConfig::new(10).with_chains(3);
        let split: Vec<usize> = (0..3).map(|k| c.samples_for_chain(k)).collect();
        assert_eq!(split, vec![4, 3, 3]);
        assert_eq!(split.iter().sum::<usize>(), 10);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(BayesConfig::new(0).validate().is_err());
        assert!(BayesConfig::new(5).with_thin(0).validate().is_err());
        assert!(BayesConfig::new(5).with_chains(0).validate().is_err());
        assert!(BayesConfig::new(5).with_chains(6).validate().is_err());
        assert!(BayesConfig::new(5).with_prior(-1.0).validate().is_err());
        assert!(BayesConfig::new(5).with_step_scale(0.0).validate().is_err());
    }
}
