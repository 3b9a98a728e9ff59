//! Lagged transition counting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CountError;
use crate::trajectory::DiscreteTrajectory;

/// Largest supported state space. Labels are dense indices, so a label of
/// `MAX_STATES` or more is rejected instead of allocating its row table.
pub const MAX_STATES: usize = 1 << 20;

/// How lagged windows are placed along a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    /// Every start frame `t = 0, 1, 2, ...` (overlapping windows).
    #[default]
    Sliding,
    /// Non-overlapping windows starting at `t = 0, lag, 2*lag, ...`.
    Sample,
}

/// Configuration for transition counting.
///
/// # Example
///
/// ```
/// use msm_counts::{CountConfig, CountMode};
///
/// let config = CountConfig::new(5).with_mode(CountMode::Sample);
/// assert_eq!(config.lag(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CountConfig {
    lag: usize,
    mode: CountMode,
    min_states: usize,
}

impl CountConfig {
    /// Creates a configuration for the given lag.
    ///
    /// Defaults: `mode = Sliding`, `min_states = 0`.
    pub fn new(lag: usize) -> Self {
        Self {
            lag,
            mode: CountMode::Sliding,
            min_states: 0,
        }
    }

    /// Sets the window placement mode.
    pub fn with_mode(mut self, mode: CountMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets a minimum size for the counted state space.
    ///
    /// Useful when the label space is known to be larger than the labels
    /// that happen to occur in the data.
    pub fn with_min_states(mut self, n: usize) -> Self {
        self.min_states = n;
        self
    }

    /// Returns a copy with a different lag and the same other settings.
    pub fn at_lag(&self, lag: usize) -> Self {
        Self {
            lag,
            ..self.clone()
        }
    }

    /// Returns the lag.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Returns the window placement mode.
    pub fn mode(&self) -> CountMode {
        self.mode
    }

    /// Returns the minimum state-space size.
    pub fn min_states(&self) -> usize {
        self.min_states
    }
}

/// Square, row-sparse matrix of transition counts.
///
/// `get(i, j)` is the number of observed transitions from state `i` to
/// state `j` separated by exactly `lag` steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountMatrix {
    lag: usize,
    rows: Vec<BTreeMap<usize, u64>>,
}

impl CountMatrix {
    /// Creates an all-zero count matrix.
    pub fn zeros(n_states: usize, lag: usize) -> Self {
        Self {
            lag,
            rows: vec![BTreeMap::new(); n_states],
        }
    }

    /// Builds a count matrix from a dense row-major table.
    ///
    /// # Errors
    ///
    /// Returns [`CountError::NotSquare`] if any row length differs from the
    /// number of rows.
    pub fn from_dense(dense: &[Vec<u64>], lag: usize) -> Result<Self, CountError> {
        let n = dense.len();
        let mut out = Self::zeros(n, lag);
        for (i, row) in dense.iter().enumerate() {
            if row.len() != n {
                return Err(CountError::NotSquare {
                    row: i,
                    expected: n,
                    got: row.len(),
                });
            }
            for (j, &c) in row.iter().enumerate() {
                out.add(i, j, c);
            }
        }
        Ok(out)
    }

    /// Adds `count` transitions from `i` to `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of bounds.
    pub(crate) fn add(&mut self, i: usize, j: usize, count: u64) {
        assert!(j < self.rows.len(), "column {j} out of bounds");
        if count > 0 {
            *self.rows[i].entry(j).or_insert(0) += count;
        }
    }

    /// Checks that every stored column lies inside the state space.
    ///
    /// Matrices built in this crate always pass; deserialized ones may not.
    ///
    /// # Errors
    ///
    /// Returns [`CountError::ColumnOutOfRange`] for the first offending entry.
    pub fn validate(&self) -> Result<(), CountError> {
        let n = self.n_states();
        for (i, row) in self.rows.iter().enumerate() {
            if let Some((&j, _)) = row.range(n..).next() {
                return Err(CountError::ColumnOutOfRange {
                    row: i,
                    col: j,
                    n_states: n,
                });
            }
        }
        Ok(())
    }

    /// Returns the lag the counts were collected at.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Returns the number of states (rows).
    pub fn n_states(&self) -> usize {
        self.rows.len()
    }

    /// Returns the count from `i` to `j`.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.rows[i].get(&j).copied().unwrap_or(0)
    }

    /// Iterates over the nonzero entries `(j, count)` of row `i` in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.rows[i].iter().map(|(&j, &c)| (j, c))
    }

    /// Iterates over all nonzero entries `(i, j, count)` in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |(&j, &c)| (i, j, c)))
    }

    /// Returns the total outgoing count of state `i`.
    pub fn row_sum(&self, i: usize) -> u64 {
        self.rows[i].values().sum()
    }

    /// Returns the total incoming count of every state.
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0; self.n_states()];
        for (_, j, c) in self.entries() {
            sums[j] += c;
        }
        sums
    }

    /// Returns the total number of counted transitions.
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.values().sum::<u64>()).sum()
    }

    /// Returns the number of nonzero entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    /// Returns the counts as a dense row-major `f64` table.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.n_states();
        let mut dense = vec![vec![0.0; n]; n];
        for (i, j, c) in self.entries() {
            dense[i][j] = c as f64;
        }
        dense
    }

    /// Returns the sub-matrix over `states`, re-indexed by position.
    ///
    /// `states` must be sorted, unique and in range; callers in this crate
    /// guarantee that.
    pub(crate) fn submatrix(&self, states: &[usize]) -> Self {
        let mut position = vec![None; self.n_states()];
        for (k, &s) in states.iter().enumerate() {
            position[s] = Some(k);
        }
        let mut out = Self::zeros(states.len(), self.lag);
        for (k, &s) in states.iter().enumerate() {
            for (j, c) in self.row(s) {
                if let Some(kj) = position[j] {
                    out.add(k, kj, c);
                }
            }
        }
        out
    }
}

/// Counts lagged transitions over one or more trajectories.
///
/// For every trajectory and every window start `t` allowed by the count
/// mode, increments `C[x[t]][x[t + lag]]` when both ends are valid labels.
/// Windows never cross trajectory boundaries.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`CountError::EmptyInput`] | `trajectories` is empty |
/// | [`CountError::InvalidLag`] | `lag == 0` |
/// | [`CountError::InsufficientData`] | no trajectory is longer than `lag` |
/// | [`CountError::TooManyStates`] | a label is `MAX_STATES` or larger |
#[tracing::instrument(skip(trajectories), fields(n_traj = trajectories.len(), lag = config.lag()))]
pub fn count_transitions(
    trajectories: &[DiscreteTrajectory],
    config: &CountConfig,
) -> Result<CountMatrix, CountError> {
    if trajectories.is_empty() {
        return Err(CountError::EmptyInput);
    }
    let lag = config.lag();
    if lag == 0 {
        return Err(CountError::InvalidLag { lag });
    }
    let longest = trajectories.iter().map(|t| t.len()).max().unwrap_or(0);
    if longest <= lag {
        return Err(CountError::InsufficientData { lag, longest });
    }

    let max_label = trajectories.iter().filter_map(|t| t.max_state()).max();
    if let Some(label) = max_label.filter(|&m| m >= MAX_STATES) {
        return Err(CountError::TooManyStates {
            label,
            max: MAX_STATES,
        });
    }
    let n_states = max_label.map_or(0, |m| m + 1).max(config.min_states());

    let step = match config.mode() {
        CountMode::Sliding => 1,
        CountMode::Sample => lag,
    };

    let mut counts = CountMatrix::zeros(n_states, lag);
    for traj in trajectories {
        if traj.len() <= lag {
            continue;
        }
        for t in (0..traj.len() - lag).step_by(step) {
            if let (Some(from), Some(to)) = (traj.state_at(t), traj.state_at(t + lag)) {
                counts.add(from, to, 1);
            }
        }
    }

    debug!(
        n_states,
        total = counts.total(),
        nnz = counts.nnz(),
        "transition counts collected"
    );
    Ok(counts)
}
