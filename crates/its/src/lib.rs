//! Implied timescale scans.
//!
//! Estimates a Markov state model at each lag of a sweep and reports how its
//! slowest implied timescales depend on the lag. Timescales that level off
//! with increasing lag mark the lag from which the dynamics look Markovian.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────┐     ┌───────────────────┐     ┌───────────────────┐
//!  │  lags (rayon) │────▶│ estimate_msm(lag) │────▶│ spectrum (+ bands │
//!  │               │     │                   │     │  from posterior)  │
//!  └──────────────┘     └───────────────────┘     └───────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use msm_counts::DiscreteTrajectory;
//! use msm_estimate::{CancelToken, EstimatorConfig};
//! use msm_its::{ItsConfig, implied_timescales};
//!
//! let traj = DiscreteTrajectory::new(vec![0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0, 0, 1, 1]);
//! let config = ItsConfig::new(vec![1, 2], 1, EstimatorConfig::new(1));
//! let its = implied_timescales(&[traj], &config, &CancelToken::new()).unwrap();
//! assert_eq!(its.lags.len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod result;
pub mod scan;

pub use config::{ErrorMode, ItsConfig};
pub use error::ItsError;
pub use result::{ItsResult, LagTimescales, TimescaleBand};
pub use scan::implied_timescales;
