//! Error types for the msm-estimate crate.

use msm_counts::CountError;

/// Error type for all fallible operations in the msm-estimate crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimateError {
    /// Counting or connectivity error.
    #[error(transparent)]
    Count(#[from] CountError),

    /// Returned when the reversible fixed-point iteration leaves the
    /// feasible region (a stationary weight becomes non-positive or
    /// non-finite).
    #[error("numerical instability at iteration {iteration}: stationary weight of state {state} is {value}")]
    NumericalInstability {
        /// Iteration at which the problem was detected.
        iteration: usize,
        /// Position of the offending state in the connected set.
        state: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when an estimator configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a matrix is not a valid transition matrix.
    #[error("invalid transition matrix: {reason}")]
    InvalidMatrix {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a state label is not part of the model.
    #[error("state {label} is not in the active set")]
    UnknownState {
        /// The requested label.
        label: usize,
    },

    /// Returned when a pre-allocated buffer has the wrong length.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch {
        /// Expected buffer length.
        expected: usize,
        /// Actual buffer length.
        got: usize,
    },
}
