//! Configuration for transition matrix estimation.

use msm_counts::{ConnectivityMode, CountConfig, CountMode};

use crate::error::EstimateError;

/// Whether the estimate is constrained to detailed balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reversibility {
    /// Closed-form row normalization of the counts.
    NonReversible,
    /// Maximum likelihood under detailed balance (fixed-point iteration).
    #[default]
    Reversible,
}

impl Reversibility {
    /// Returns true for [`Reversibility::Reversible`].
    pub fn is_reversible(self) -> bool {
        matches!(self, Self::Reversible)
    }
}

/// Configuration for Markov state model estimation.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use msm_estimate::{EstimatorConfig, Reversibility};
///
/// let config = EstimatorConfig::new(10)
///     .with_reversibility(Reversibility::NonReversible)
///     .with_max_iter(500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct EstimatorConfig {
    count: CountConfig,
    reversibility: Reversibility,
    connectivity: ConnectivityMode,
    tol: f64,
    max_iter: usize,
    damping: f64,
}

impl EstimatorConfig {
    /// Creates a new configuration for the given lag with defaults.
    ///
    /// Defaults: `Reversible`, sliding counts, largest connected set,
    /// `tol = 1e-10`, `max_iter = 100_000`, `damping = 0.0`.
    pub fn new(lag: usize) -> Self {
        Self {
            count: CountConfig::new(lag),
            reversibility: Reversibility::Reversible,
            connectivity: ConnectivityMode::Largest,
            tol: 1e-10,
            max_iter: 100_000,
            damping: 0.0,
        }
    }

    /// Sets the reversibility constraint.
    pub fn with_reversibility(mut self, reversibility: Reversibility) -> Self {
        self.reversibility = reversibility;
        self
    }

    /// Sets the count window mode.
    pub fn with_count_mode(mut self, mode: CountMode) -> Self {
        self.count = self.count.with_mode(mode);
        self
    }

    /// Sets the connected-set selection mode.
    pub fn with_connectivity(mut self, connectivity: ConnectivityMode) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Sets the convergence tolerance on the maximum entrywise change of T.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the iteration cap of the reversible solver.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the damping weight given to the previous iterate, in `[0, 1)`.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Returns a copy of this configuration at another lag.
    pub fn at_lag(&self, lag: usize) -> Self {
        Self {
            count: self.count.at_lag(lag),
            ..self.clone()
        }
    }

    // --- Accessors ---

    /// Returns the lag.
    pub fn lag(&self) -> usize {
        self.count.lag()
    }

    /// Returns the counting configuration.
    pub fn count(&self) -> &CountConfig {
        &self.count
    }

    /// Returns the reversibility constraint.
    pub fn reversibility(&self) -> Reversibility {
        self.reversibility
    }

    /// Returns the connected-set selection mode.
    pub fn connectivity(&self) -> &ConnectivityMode {
        &self.connectivity
    }

    /// Returns the convergence tolerance.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Returns the iteration cap.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Returns the damping weight.
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Validates this configuration.
    ///
    /// Checks that the lag is at least 1, `tol` is finite and positive,
    /// `max_iter` is at least 1 and `damping` lies in `[0, 1)`.
    pub fn validate(&self) -> Result<(), EstimateError> {
        if self.lag() == 0 {
            return Err(EstimateError::InvalidConfig {
                reason: "lag must be >= 1".to_string(),
            });
        }
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(EstimateError::InvalidConfig {
                reason: format!("tol must be finite and positive, got {}", self.tol),
            });
        }
        if self.max_iter == 0 {
            return Err(EstimateError::InvalidConfig {
                reason: "max_iter must be >= 1".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(EstimateError::InvalidConfig {
                reason: format!("damping must be in [0, 1), got {}", self.damping),
            });
        }
        Ok(())
    }
}
