//! Discrete state trajectories.

/// Sentinel label for an unassigned frame.
///
/// Any negative label is treated as missing; `MISSING` is the canonical one.
pub const MISSING: i32 = -1;

/// An ordered sequence of state labels, one per sampled timestep.
///
/// Labels are non-negative state indices. Negative labels mark gaps
/// (unassigned frames) and never take part in a counted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteTrajectory {
    states: Vec<i32>,
}

impl DiscreteTrajectory {
    /// Wraps a sequence of state labels.
    pub fn new(states: Vec<i32>) -> Self {
        Self { states }
    }

    /// Returns the raw labels, gaps included.
    pub fn as_slice(&self) -> &[i32] {
        &self.states
    }

    /// Returns the number of frames, gaps included.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the trajectory has no frames.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns the state at frame `t`, or `None` for a gap.
    ///
    /// # Panics
    ///
    /// Panics if `t` is out of bounds.
    pub fn state_at(&self, t: usize) -> Option<usize> {
        let s = self.states[t];
        (s >= 0).then_some(s as usize)
    }

    /// Returns the number of non-gap frames.
    pub fn n_valid(&self) -> usize {
        self.states.iter().filter(|&&s| s >= 0).count()
    }

    /// Returns the largest valid label, or `None` if every frame is a gap.
    pub fn max_state(&self) -> Option<usize> {
        self.states
            .iter()
            .filter(|&&s| s >= 0)
            .max()
            .map(|&s| s as usize)
    }
}

impl From<Vec<i32>> for DiscreteTrajectory {
    fn from(states: Vec<i32>) -> Self {
        Self::new(states)
    }
}
