//! Error types for the msm-bayes crate.

use msm_estimate::EstimateError;

/// Error type for all fallible operations in the msm-bayes crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BayesError {
    /// Estimation error while building the starting point.
    #[error(transparent)]
    Estimate(#[from] EstimateError),

    /// Returned when a sampler configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a state has no transitions to any other state, so the
    /// reversible posterior is improper.
    #[error("state {state} is isolated in the count matrix")]
    IsolatedState {
        /// Position of the isolated state.
        state: usize,
    },

    /// Returned when a recorded sample is not row-stochastic or violates
    /// detailed balance.
    #[error("sample {index} of chain {chain} violates an invariant: {reason}")]
    InvariantViolated {
        /// Chain index.
        chain: usize,
        /// Sample index within the chain.
        index: usize,
        /// Which invariant failed.
        reason: String,
    },

    /// Returned when sampling was cancelled through a [`msm_estimate::CancelToken`].
    #[error("sampling cancelled")]
    Cancelled,
}
