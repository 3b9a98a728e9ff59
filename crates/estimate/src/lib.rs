//! Maximum-likelihood Markov state model estimation.
//!
//! Turns discrete trajectories into a row-stochastic transition matrix and
//! its stationary distribution, optionally constrained to detailed balance.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//!  │    count      │────▶│   connect    │────▶│   estimate T     │────▶│   simulate   │
//!  │  (C at lag)   │     │ (active set) │     │ (MLE, reversible)│     │ (draw states)│
//!  └──────────────┘     └──────────────┘     └──────────────────┘     └──────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use msm_counts::DiscreteTrajectory;
//! use msm_estimate::{EstimatorConfig, estimate_msm};
//!
//! let traj = DiscreteTrajectory::new(vec![0, 0, 1, 1, 0, 1, 1, 1, 0, 0]);
//! let msm = estimate_msm(&[traj], &EstimatorConfig::new(1)).unwrap();
//!
//! let pi = msm.stationary().as_slice();
//! assert!(msm.transition().detailed_balance_violation(pi) < 1e-10);
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod mle;
pub mod model;
pub mod simulate;
pub mod transition;

pub use cancel::CancelToken;
pub use config::{EstimatorConfig, Reversibility};
pub use error::EstimateError;
pub use mle::{Convergence, Estimate, FixedPoint, TransitionEstimator, log_likelihood};
pub use model::{MarkovStateModel, estimate_msm};
pub use simulate::{simulate_states, simulate_states_into};
pub use transition::{STOCHASTIC_TOL, StationaryDistribution, TransitionMatrix};
