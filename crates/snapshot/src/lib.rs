//! Versioned snapshots of Markov state models.
//!
//! A [`ModelSnapshot`] is a self-contained JSON document holding the active
//! set, counts, transition matrix, stationary distribution, estimator
//! settings and, optionally, posterior samples of one model. Snapshots are
//! kept in a [`SnapshotStore`]:
//!
//! ```text
//! MarkovStateModel ──► ModelSnapshot ──► JSON ──► SnapshotStore
//!                                                  ├─ MemoryStore
//!                                                  └─ DirStore (<name>.json)
//! ```
//!
//! Older format versions load with defaults for fields they lack; newer
//! versions are rejected with [`SnapshotError::UnsupportedVersion`].

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::SnapshotError;
pub use snapshot::{
    ConnectivityRecord, ConvergenceRecord, EstimatorRecord, FORMAT_VERSION, ModelSnapshot,
};
pub use store::{DirStore, MemoryStore, SnapshotStore};
