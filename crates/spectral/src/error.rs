//! Error types for the msm-spectral crate.

/// Error type for all fallible operations in the msm-spectral crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectralError {
    /// Returned when the spectrum is inconsistent with a connected stochastic
    /// matrix: an eigenvalue lies outside the unit disk, or +1 appears more
    /// than once.
    #[error("spectrum anomaly at eigenvalue {index}: {re} + {im}i (|lambda| = {modulus}): {reason}")]
    SpectrumAnomaly {
        /// Position in the sorted spectrum (0 is the stationary eigenvalue).
        index: usize,
        /// Real part.
        re: f64,
        /// Imaginary part.
        im: f64,
        /// Modulus.
        modulus: f64,
        /// Which check failed.
        reason: String,
    },

    /// Returned when the eigensolver produced NaN or infinity.
    #[error("eigenvalue {index} is not finite")]
    NonFiniteEigenvalue {
        /// Position in the unsorted solver output.
        index: usize,
    },

    /// Returned when the stationary distribution does not match the matrix.
    #[error("length mismatch: transition matrix has {expected} states, stationary distribution has {got}")]
    LengthMismatch {
        /// Number of states of the transition matrix.
        expected: usize,
        /// Length of the stationary distribution.
        got: usize,
    },

    /// Returned when the symmetric transform needs a strictly positive
    /// stationary distribution.
    #[error("stationary probability of state {state} is not positive: {value}")]
    NonPositiveStationary {
        /// Offending position.
        state: usize,
        /// Offending value.
        value: f64,
    },

    /// Returned when a spectral configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_spectrum_anomaly() {
        let e = SpectralError::SpectrumAnomaly {
            index: 1,
            re: 1.0,
            im: 0.0,
            modulus: 1.0,
            reason: "repeated unit eigenvalue".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "spectrum anomaly at eigenvalue 1: 1 + 0i (|lambda| = 1): repeated unit eigenvalue"
        );
    }

    #[test]
    fn error_non_finite() {
        let e = SpectralError::NonFiniteEigenvalue { index: 3 };
        assert_eq!(e.to_string(), "eigenvalue 3 is not finite");
    }

    #[test]
    fn error_length_mismatch() {
        let e = SpectralError::LengthMismatch {
            expected: 4,
            got: 3,
        };
        assert_eq!(
            e.to_string(),
            "length mismatch: transition matrix has 4 states, stationary distribution has 3"
        );
    }

    #[test]
    fn error_non_positive_stationary() {
        let e = SpectralError::NonPositiveStationary {
            state: 2,
            value: 0.0,
        };
        assert_eq!(
            e.to_string(),
            "stationary probability of state 2 is not positive: 0"
        );
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpectralError>();
    }
}
