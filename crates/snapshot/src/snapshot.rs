//! The serializable model snapshot and its format versioning.
//!
//! Version history:
//!
//! | Version | Adds |
//! |---------|------|
//! | 1 | model parts, estimator settings |
//! | 2 | `estimator.count_mode`, posterior samples |
//! | 3 | `estimator.damping`, `estimator.connectivity` |
//!
//! Fields added after version 1 carry serde defaults, so older snapshots load
//! unchanged.

use msm_bayes::BayesianSample;
use msm_counts::{ConnectedSet, ConnectivityMode, CountMatrix, CountMode};
use msm_estimate::{
    Convergence, EstimatorConfig, MarkovStateModel, Reversibility, StationaryDistribution,
    TransitionMatrix,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SnapshotError;

/// Format version written by this build.
pub const FORMAT_VERSION: u32 = 3;

/// Serializable mirror of [`ConnectivityMode`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectivityRecord {
    /// Largest connected set.
    #[default]
    Largest,
    /// All states carrying counts.
    All,
    /// Largest connected set inside the listed labels.
    Given {
        /// Candidate state labels.
        states: Vec<usize>,
    },
}

impl From<&ConnectivityMode> for ConnectivityRecord {
    fn from(mode: &ConnectivityMode) -> Self {
        match mode {
            ConnectivityMode::Largest => Self::Largest,
            ConnectivityMode::All => Self::All,
            ConnectivityMode::Given(states) => Self::Given {
                states: states.clone(),
            },
        }
    }
}

impl From<&ConnectivityRecord> for ConnectivityMode {
    fn from(record: &ConnectivityRecord) -> Self {
        match record {
            ConnectivityRecord::Largest => Self::Largest,
            ConnectivityRecord::All => Self::All,
            ConnectivityRecord::Given { states } => Self::Given(states.clone()),
        }
    }
}

/// Estimator settings recorded alongside the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorRecord {
    /// Lag time in steps.
    pub lag: usize,
    /// Whether detailed balance was enforced.
    pub reversible: bool,
    /// Window placement used for counting.
    #[serde(default)]
    pub count_mode: CountMode,
    /// Connected-set selection.
    #[serde(default)]
    pub connectivity: ConnectivityRecord,
    /// Convergence tolerance of the reversible solver.
    pub tol: f64,
    /// Iteration cap of the reversible solver.
    pub max_iter: usize,
    /// Damping weight of the reversible solver.
    #[serde(default)]
    pub damping: f64,
}

impl EstimatorRecord {
    fn from_config(config: &EstimatorConfig) -> Self {
        Self {
            lag: config.lag(),
            reversible: config.reversibility().is_reversible(),
            count_mode: config.count().mode(),
            connectivity: config.connectivity().into(),
            tol: config.tol(),
            max_iter: config.max_iter(),
            damping: config.damping(),
        }
    }

    /// Rebuilds an estimator configuration with these settings.
    pub fn to_config(&self) -> EstimatorConfig {
        EstimatorConfig::new(self.lag)
            .with_reversibility(self.reversibility())
            .with_count_mode(self.count_mode)
            .with_connectivity((&self.connectivity).into())
            .with_tol(self.tol)
            .with_max_iter(self.max_iter)
            .with_damping(self.damping)
    }

    fn reversibility(&self) -> Reversibility {
        if self.reversible {
            Reversibility::Reversible
        } else {
            Reversibility::NonReversible
        }
    }
}

/// Serializable mirror of [`Convergence`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConvergenceRecord {
    /// Closed-form estimate, no iteration.
    Closed,
    /// The solver met its tolerance.
    Converged {
        /// Iterations performed.
        iterations: usize,
        /// Final maximum entrywise change of T.
        max_change: f64,
    },
    /// The solver hit its iteration cap.
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Final maximum entrywise change of T.
        max_change: f64,
    },
}

impl From<Convergence> for ConvergenceRecord {
    fn from(c: Convergence) -> Self {
        match c {
            Convergence::Closed => Self::Closed,
            Convergence::Converged {
                iterations,
                max_change,
            } => Self::Converged {
                iterations,
                max_change,
            },
            Convergence::NotConverged {
                iterations,
                max_change,
            } => Self::NotConverged {
                iterations,
                max_change,
            },
        }
    }
}

impl From<ConvergenceRecord> for Convergence {
    fn from(c: ConvergenceRecord) -> Self {
        match c {
            ConvergenceRecord::Closed => Self::Closed,
            ConvergenceRecord::Converged {
                iterations,
                max_change,
            } => Self::Converged {
                iterations,
                max_change,
            },
            ConvergenceRecord::NotConverged {
                iterations,
                max_change,
            } => Self::NotConverged {
                iterations,
                max_change,
            },
        }
    }
}

/// A named, versioned, self-contained copy of an estimated model.
///
/// # Example
///
/// ```
/// use msm_counts::DiscreteTrajectory;
/// use msm_estimate::{EstimatorConfig, estimate_msm};
/// use msm_snapshot::ModelSnapshot;
///
/// let traj = DiscreteTrajectory::new(vec![0, 0, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0]);
/// let config = EstimatorConfig::new(1);
/// let msm = estimate_msm(&[traj], &config).unwrap();
///
/// let snapshot = ModelSnapshot::new("two-state", &msm, &config);
/// let json = snapshot.to_json().unwrap();
/// let restored = ModelSnapshot::from_json(&json).unwrap().to_model().unwrap();
/// assert_eq!(restored.active_set(), msm.active_set());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Format version; [`FORMAT_VERSION`] once loaded.
    pub format_version: u32,
    /// Store key.
    pub name: String,
    /// Settings the model was estimated with.
    pub estimator: EstimatorRecord,
    /// Connected set the matrices are indexed by.
    pub active_set: ConnectedSet,
    /// Counts restricted to the active set.
    pub counts: CountMatrix,
    /// Row-major transition matrix.
    pub transition: Vec<Vec<f64>>,
    /// Stationary distribution, one entry per active state.
    pub stationary: Vec<f64>,
    /// Solver outcome.
    pub convergence: ConvergenceRecord,
    /// Posterior transition matrices, empty when none were sampled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posterior: Vec<Vec<Vec<f64>>>,
}

#[derive(Deserialize)]
struct VersionTag {
    format_version: u32,
}

impl ModelSnapshot {
    /// Captures `msm` under `name` together with the estimator settings.
    pub fn new(name: impl Into<String>, msm: &MarkovStateModel, config: &EstimatorConfig) -> Self {
        let mut estimator = EstimatorRecord::from_config(config);
        estimator.lag = msm.lag();
        estimator.reversible = msm.reversibility().is_reversible();
        Self {
            format_version: FORMAT_VERSION,
            name: name.into(),
            estimator,
            active_set: msm.active_set().clone(),
            counts: msm.counts().clone(),
            transition: msm.transition().to_rows(),
            stationary: msm.stationary().as_slice().to_vec(),
            convergence: msm.convergence().into(),
            posterior: Vec::new(),
        }
    }

    /// Attaches posterior transition matrices.
    pub fn with_posterior(mut self, sample: &BayesianSample) -> Self {
        self.posterior = sample.transitions().iter().map(|t| t.to_rows()).collect();
        self
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] if serialization fails (a
    /// non-finite float, for instance).
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot, accepting every format version up to
    /// [`FORMAT_VERSION`].
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`SnapshotError::Malformed`] | invalid JSON or missing fields |
    /// | [`SnapshotError::UnsupportedVersion`] | version 0 or newer than [`FORMAT_VERSION`] |
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let tag: VersionTag = serde_json::from_str(text)?;
        if tag.format_version == 0 || tag.format_version > FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: tag.format_version,
                supported: FORMAT_VERSION,
            });
        }
        let mut snapshot: ModelSnapshot = serde_json::from_str(text)?;
        if snapshot.format_version < FORMAT_VERSION {
            debug!(
                name = %snapshot.name,
                from = snapshot.format_version,
                to = FORMAT_VERSION,
                "upgrading snapshot"
            );
            snapshot.format_version = FORMAT_VERSION;
        }
        Ok(snapshot)
    }

    /// Rebuilds the model.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Estimate`] if the stored parts are
    /// inconsistent: an unsorted active set, counts outside the active set,
    /// a transition matrix that is not row-stochastic or a stationary
    /// vector that T does not preserve.
    pub fn to_model(&self) -> Result<MarkovStateModel, SnapshotError> {
        let transition = TransitionMatrix::from_rows(&self.transition)?;
        let stationary = StationaryDistribution::from_weights(self.stationary.clone())?;
        Ok(MarkovStateModel::from_parts(
            self.active_set.clone(),
            self.counts.clone(),
            transition,
            stationary,
            self.estimator.reversibility(),
            self.convergence.into(),
        )?)
    }

    /// Rebuilds the stored posterior transition matrices.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Estimate`] if a stored matrix is invalid.
    pub fn posterior_transitions(&self) -> Result<Vec<TransitionMatrix>, SnapshotError> {
        self.posterior
            .iter()
            .map(|rows| TransitionMatrix::from_rows(rows).map_err(SnapshotError::from))
            .collect()
    }
}
