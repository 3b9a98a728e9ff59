//! # msm-counts
//!
//! Turns discrete state trajectories into lagged transition count matrices
//! and restricts them to a connected set of states, the two steps every
//! transition-matrix estimate starts from.
//!
//! ## Pipeline
//!
//! ```text
//!  ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//!  │  trajectories     │────▶│ count_transitions │────▶│     connect      │
//!  │  (state labels)   │     │  (C at lag τ)     │     │ (largest set)    │
//!  └──────────────────┘     └──────────────────┘     └──────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use msm_counts::{
//!     ConnectivityMode, CountConfig, DiscreteTrajectory, connect, count_transitions,
//! };
//!
//! let traj = DiscreteTrajectory::new(vec![0, 0, 1, 1, 0, 1, 0, 0]);
//! let counts = count_transitions(&[traj], &CountConfig::new(1)).unwrap();
//! let (set, restricted) = connect(&counts, false, &ConnectivityMode::Largest).unwrap();
//!
//! assert_eq!(set.states(), &[0, 1]);
//! assert_eq!(restricted.total(), 7);
//! ```

pub mod connectivity;
pub mod count;
pub mod error;
pub mod trajectory;

pub use connectivity::{
    ConnectedSet, ConnectivityMode, connect, connected_sets, largest_connected_set, restrict,
};
pub use count::{CountConfig, CountMatrix, CountMode, MAX_STATES, count_transitions};
pub use error::CountError;
pub use trajectory::{DiscreteTrajectory, MISSING};
