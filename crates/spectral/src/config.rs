//! Configuration for spectral analysis.

use crate::error::SpectralError;

/// Configuration for [`crate::spectrum`].
///
/// # Example
///
/// ```
/// use msm_spectral::SpectralConfig;
///
/// let config = SpectralConfig::new(5).with_tol(1e-9);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.k(), 5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralConfig {
    k: usize,
    tol: f64,
}

impl SpectralConfig {
    /// Requests the `k` slowest timescales, with tolerance `1e-10`.
    pub fn new(k: usize) -> Self {
        Self { k, tol: 1e-10 }
    }

    /// Sets the tolerance used for the unit-circle checks.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Returns a copy requesting `k` timescales.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    // --- Accessors ---

    /// Number of timescales requested.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Tolerance for `|lambda| > 1`, repeated `+1` and periodic-mode checks.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SpectralError> {
        if self.k == 0 {
            return Err(SpectralError::InvalidConfig {
                reason: "k must be >= 1".to_string(),
            });
        }
        if !(self.tol > 0.0 && self.tol < 0.1) {
            return Err(SpectralError::InvalidConfig {
                reason: format!("tol must be in (0, 0.1), got {}", self.tol),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = SpectralConfig::new(3);
        assert_eq!(c.k(), 3);
        assert_eq!(c.tol(), 1e-10);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_zero_k() {
        assert!(matches!(
            SpectralConfig::new(0).validate(),
            Err(SpectralError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_bad_tol() {
        assert!(SpectralConfig::new(1).with_tol(0.0).validate().is_err());
        assert!(SpectralConfig::new(1).with_tol(0.5).validate().is_err());
        assert!(SpectralConfig::new(1).with_tol(f64::NAN).validate().is_err());
    }
}
