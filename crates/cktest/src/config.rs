//! Configuration for the Chapman-Kolmogorov test.

use msm_bayes::BayesConfig;
use msm_estimate::EstimatorConfig;

use crate::error::CkError;

/// Configuration for [`crate::ck_test`].
///
/// The estimator configuration is used to re-estimate at each multiple of
/// the model lag; its own lag is ignored.
///
/// # Example
///
/// ```
/// use msm_cktest::CkConfig;
/// use msm_estimate::EstimatorConfig;
///
/// let config = CkConfig::new(vec![1, 2, 4], EstimatorConfig::new(1)).with_tolerance(0.02);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct CkConfig {
    multipliers: Vec<u32>,
    estimator: EstimatorConfig,
    tolerance: f64,
    bayes: Option<BayesConfig>,
    confidence: f64,
}

impl CkConfig {
    /// Creates a configuration testing the given lag multipliers.
    ///
    /// Defaults: `tolerance = 0.05`, no confidence intervals,
    /// `confidence = 0.95`.
    pub fn new(multipliers: Vec<u32>, estimator: EstimatorConfig) -> Self {
        Self {
            multipliers,
            estimator,
            tolerance: 0.05,
            bayes: None,
            confidence: 0.95,
        }
    }

    /// Sets the absolute tolerance for point-estimate agreement.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Enables confidence intervals from posterior samples. Agreement then
    /// means overlapping intervals.
    pub fn with_bayes(mut self, bayes: BayesConfig) -> Self {
        self.bayes = Some(bayes);
        self
    }

    /// Sets the interval confidence level.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    // --- Accessors ---

    /// Lag multipliers.
    pub fn multipliers(&self) -> &[u32] {
        &self.multipliers
    }

    /// Estimator used for re-estimation.
    pub fn estimator(&self) -> &EstimatorConfig {
        &self.estimator
    }

    /// Absolute agreement tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Sampler settings, if intervals are requested.
    pub fn bayes(&self) -> Option<&BayesConfig> {
        self.bayes.as_ref()
    }

    /// Interval confidence level.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CkError::InvalidConfig`] for an empty multiplier list, a
    /// zero multiplier, a tolerance outside `[0, 1]` or a confidence outside
    /// `(0, 1)`.
    pub fn validate(&self) -> Result<(), CkError> {
        if self.multipliers.is_empty() || self.multipliers.contains(&0) {
            return Err(CkError::InvalidConfig {
                reason: format!(
                    "multipliers must be non-empty and positive: {:?}",
                    self.multipliers
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(CkError::InvalidConfig {
                reason: format!("tolerance must be in [0, 1], got {}", self.tolerance),
            });
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(CkError::InvalidConfig {
                reason: format!("confidence must be in (0, 1), got {}", self.confidence),
            });
        }
        self.estimator.validate()?;
        if let Some(bayes) = &self.bayes {
            bayes.validate()?;
        }
        Ok(())
    }
}
