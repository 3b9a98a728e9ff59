//! Error types for the msm-its crate.

use msm_bayes::BayesError;
use msm_estimate::EstimateError;
use msm_spectral::SpectralError;

/// Error type for all fallible operations in the msm-its crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItsError {
    /// Counting, connectivity or estimation failed at some lag.
    #[error(transparent)]
    Estimate(#[from] EstimateError),

    /// Eigenvalue analysis of a point estimate failed.
    #[error(transparent)]
    Spectral(#[from] SpectralError),

    /// Posterior sampling failed.
    #[error(transparent)]
    Bayes(#[from] BayesError),

    /// Returned when the scan configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when the scan was cancelled.
    #[error("timescale scan cancelled")]
    Cancelled,
}
