//! Chapman-Kolmogorov validation of Markov state models.
//!
//! A Markovian model at lag `tau` must predict its own behaviour at
//! `m * tau`: `T(m tau) ≈ T(tau)^m`. The test checks this in a
//! coarse-grained space of metastable sets, where the comparison is
//! statistically meaningful.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────┐     ┌───────────────────────┐     ┌─────────────────┐
//!  │ msm at tau    │────▶│ per multiplier (rayon)│────▶│ CkResult        │
//!  │ + coarse map  │     │ T^m vs T(m tau)       │     │ (agree / not)   │
//!  └──────────────┘     └───────────────────────┘     └─────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use msm_cktest::{CkConfig, CoarseMap, ck_test};
//! use msm_counts::DiscreteTrajectory;
//! use msm_estimate::{CancelToken, EstimatorConfig, estimate_msm};
//!
//! let traj = DiscreteTrajectory::new(vec![0, 0, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0, 1, 0, 0, 1]);
//! let msm = estimate_msm(std::slice::from_ref(&traj), &EstimatorConfig::new(1)).unwrap();
//! let map = CoarseMap::new([(0, 0), (1, 1)]);
//! let config = CkConfig::new(vec![1, 2], EstimatorConfig::new(1));
//! let result = ck_test(&msm, &[traj], &map, &config, &CancelToken::new()).unwrap();
//! assert_eq!(result.steps.len(), 2);
//! ```

pub mod coarse;
pub mod config;
pub mod error;
pub mod result;
pub mod validate;

pub use coarse::{CoarseMap, project};
pub use config::CkConfig;
pub use error::CkError;
pub use result::{CkEntry, CkResult, CkStep};
pub use validate::ck_test;
