//! Error types for the msm-cktest crate.

use msm_bayes::BayesError;
use msm_estimate::EstimateError;

/// Error type for all fallible operations in the msm-cktest crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CkError {
    /// Re-estimation at a multiple of the lag failed.
    #[error(transparent)]
    Estimate(#[from] EstimateError),

    /// Posterior sampling for confidence intervals failed.
    #[error(transparent)]
    Bayes(#[from] BayesError),

    /// Returned when the test configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when an active state has no coarse label.
    #[error("coarse map does not cover active state {label}")]
    IncompleteCoarseMap {
        /// The unmapped fine label.
        label: usize,
    },

    /// Returned when the test was cancelled.
    #[error("CK test cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_incomplete_map() {
        let e = CkError::IncompleteCoarseMap { label: 4 };
        assert_eq!(e.to_string(), "coarse map does not cover active state 4");
    }

    #[test]
    fn error_cancelled() {
        assert_eq!(CkError::Cancelled.to_string(), "CK test cancelled");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CkError>();
    }
}
