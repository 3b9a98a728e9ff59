//! CK test results.

use serde::Serialize;

/// Predicted versus estimated probability for one coarse pair at one
/// multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CkEntry {
    /// Source coarse label.
    pub from: usize,
    /// Target coarse label.
    pub to: usize,
    /// `P(from -> to)` from `T(tau)^m`; `None` if either set is empty.
    pub predicted: Option<f64>,
    /// `P(from -> to)` re-estimated at lag `m * tau`; `None` if either set is
    /// missing from the re-estimated active set.
    pub estimated: Option<f64>,
    /// Percentile interval of the prediction over posterior samples.
    pub predicted_interval: Option<(f64, f64)>,
    /// Percentile interval of the estimate over posterior samples.
    pub estimated_interval: Option<(f64, f64)>,
    /// Whether prediction and estimate agree.
    pub agrees: bool,
}

/// All coarse pairs at one lag multiplier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CkStep {
    /// Lag multiplier `m`.
    pub multiplier: u32,
    /// Lag of the re-estimated model, `m * tau`.
    pub lag: usize,
    /// Active-set size of the re-estimated model.
    pub n_active: usize,
    /// Entries ordered by `(from, to)`.
    pub entries: Vec<CkEntry>,
}

/// Outcome of a Chapman-Kolmogorov test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CkResult {
    /// Lag of the tested model.
    pub lag: usize,
    /// Coarse labels in use, sorted.
    pub coarse_states: Vec<usize>,
    /// Absolute tolerance used without intervals.
    pub tolerance: f64,
    /// Interval confidence level, when intervals were computed.
    pub confidence: Option<f64>,
    /// One step per multiplier, in the configured order.
    pub steps: Vec<CkStep>,
}

impl CkResult {
    /// Returns the entry for `(multiplier, from, to)`.
    pub fn entry(&self, multiplier: u32, from: usize, to: usize) -> Option<&CkEntry> {
        self.steps
            .iter()
            .find(|s| s.multiplier == multiplier)?
            .entries
            .iter()
            .find(|e| e.from == from && e.to == to)
    }

    /// Number of disagreeing entries across all multipliers.
    pub fn n_disagreements(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| &s.entries)
            .filter(|e| !e.agrees)
            .count()
    }

    /// Returns true if every entry agrees.
    pub fn all_agree(&self) -> bool {
        self.n_disagreements() == 0
    }
}
