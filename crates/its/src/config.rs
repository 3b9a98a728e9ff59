//! Configuration for implied timescale scans.

use msm_bayes::BayesConfig;
use msm_estimate::EstimatorConfig;

use crate::error::ItsError;

/// How uncertainty is attached to the timescales.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ErrorMode {
    /// Point estimates only.
    #[default]
    None,
    /// Posterior samples per lag, summarized as percentile bands.
    Bayes(BayesConfig),
}

/// Configuration for [`crate::implied_timescales`].
///
/// The estimator configuration's own lag is ignored; each scanned lag
/// replaces it.
///
/// # Example
///
/// ```
/// use msm_estimate::EstimatorConfig;
/// use msm_its::ItsConfig;
///
/// let config = ItsConfig::new(vec![1, 2, 5, 10], 3, EstimatorConfig::new(1));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct ItsConfig {
    lags: Vec<usize>,
    k: usize,
    estimator: EstimatorConfig,
    errors: ErrorMode,
    confidence: f64,
    spectral_tol: f64,
}

impl ItsConfig {
    /// Creates a scan over `lags` reporting `k` timescales each.
    ///
    /// Defaults: no error bars, `confidence = 0.95`, `spectral_tol = 1e-10`.
    pub fn new(lags: Vec<usize>, k: usize, estimator: EstimatorConfig) -> Self {
        Self {
            lags,
            k,
            estimator,
            errors: ErrorMode::None,
            confidence: 0.95,
            spectral_tol: 1e-10,
        }
    }

    /// Sets the error mode.
    pub fn with_errors(mut self, errors: ErrorMode) -> Self {
        self.errors = errors;
        self
    }

    /// Sets the confidence level of the Bayesian bands.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sets the tolerance of the eigenvalue checks.
    pub fn with_spectral_tol(mut self, tol: f64) -> Self {
        self.spectral_tol = tol;
        self
    }

    // --- Accessors ---

    /// Lags to scan, in steps.
    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Number of timescales per lag.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Estimator settings applied at every lag.
    pub fn estimator(&self) -> &EstimatorConfig {
        &self.estimator
    }

    /// Error mode.
    pub fn errors(&self) -> &ErrorMode {
        &self.errors
    }

    /// Confidence level of the Bayesian bands.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Tolerance of the eigenvalue checks.
    pub fn spectral_tol(&self) -> f64 {
        self.spectral_tol
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ItsError::InvalidConfig`] if the lag list is empty, contains
    /// zero or is not strictly increasing, `k == 0`, or the confidence is
    /// outside `(0, 1)`. Nested estimator and sampler configurations are
    /// validated too.
    pub fn validate(&self) -> Result<(), ItsError> {
        if self.lags.is_empty() {
            return Err(ItsError::InvalidConfig {
                reason: "at least one lag is required".to_string(),
            });
        }
        if self.lags[0] == 0 || self.lags.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ItsError::InvalidConfig {
                reason: format!("lags must be positive and strictly increasing: {:?}", self.lags),
            });
        }
        if self.k == 0 {
            return Err(ItsError::InvalidConfig {
                reason: "k must be >= 1".to_string(),
            });
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ItsError::InvalidConfig {
                reason: format!("confidence must be in (0, 1), got {}", self.confidence),
            });
        }
        self.estimator.validate()?;
        if let ErrorMode::Bayes(bayes) = &self.errors {
            bayes.validate()?;
        }
        Ok(())
    }
}
