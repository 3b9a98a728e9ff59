//! Posterior samples and their summaries.

use msm_estimate::{StationaryDistribution, TransitionMatrix};
use msm_stats::percentile_interval;

/// Proposal counters for one kind of Metropolis move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveStats {
    /// Proposals made.
    pub proposed: u64,
    /// Proposals accepted.
    pub accepted: u64,
}

impl MoveStats {
    /// Fraction of proposals accepted, `None` if nothing was proposed.
    pub fn rate(&self) -> Option<f64> {
        (self.proposed > 0).then(|| self.accepted as f64 / self.proposed as f64)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            proposed: self.proposed + other.proposed,
            accepted: self.accepted + other.accepted,
        }
    }
}

/// Output of a single chain.
#[derive(Debug, Default)]
pub(crate) struct ChainOutput {
    pub(crate) samples: Vec<TransitionMatrix>,
    pub(crate) stationary: Vec<StationaryDistribution>,
    pub(crate) edge_stats: MoveStats,
    pub(crate) node_stats: MoveStats,
}

impl ChainOutput {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            samples: Vec::with_capacity(n),
            stationary: Vec::with_capacity(n),
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, transition: TransitionMatrix, stationary: StationaryDistribution) {
        self.samples.push(transition);
        self.stationary.push(stationary);
    }
}

/// An ordered collection of posterior transition matrices.
///
/// Every sample is row-stochastic over the same states; for reversible
/// sampling each is in detailed balance with its stationary distribution.
#[derive(Debug, Clone)]
pub struct BayesianSample {
    samples: Vec<TransitionMatrix>,
    stationary: Vec<StationaryDistribution>,
    edge_stats: MoveStats,
    node_stats: MoveStats,
}

impl BayesianSample {
    /// Concatenates chain outputs in chain order.
    pub(crate) fn from_chains(chains: Vec<ChainOutput>) -> Self {
        let total: usize = chains.iter().map(|c| c.samples.len()).sum();
        let mut out = Self {
            samples: Vec::with_capacity(total),
            stationary: Vec::with_capacity(total),
            edge_stats: MoveStats::default(),
            node_stats: MoveStats::default(),
        };
        for chain in chains {
            out.samples.extend(chain.samples);
            out.stationary.extend(chain.stationary);
            out.edge_stats = out.edge_stats.merge(chain.edge_stats);
            out.node_stats = out.node_stats.merge(chain.node_stats);
        }
        out
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sampled transition matrices.
    pub fn transitions(&self) -> &[TransitionMatrix] {
        &self.samples
    }

    /// Stationary distribution of each sample.
    pub fn stationary(&self) -> &[StationaryDistribution] {
        &self.stationary
    }

    /// Iterates over `(transition, stationary)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&TransitionMatrix, &StationaryDistribution)> {
        self.samples.iter().zip(&self.stationary)
    }

    /// Edge-shift move counters (reversible sampling only).
    pub fn edge_moves(&self) -> MoveStats {
        self.edge_stats
    }

    /// Node-rescale move counters (reversible sampling only).
    pub fn node_moves(&self) -> MoveStats {
        self.node_stats
    }

    /// Elementwise mean transition matrix as row-major rows.
    pub fn mean_transition(&self) -> Vec<Vec<f64>> {
        let Some(first) = self.samples.first() else {
            return Vec::new();
        };
        let n = first.n_states();
        let mut mean = vec![vec![0.0; n]; n];
        for t in &self.samples {
            for (i, row) in mean.iter_mut().enumerate() {
                for (j, m) in row.iter_mut().enumerate() {
                    *m += t.prob(i, j);
                }
            }
        }
        let m = self.samples.len() as f64;
        mean.iter_mut().flatten().for_each(|v| *v /= m);
        mean
    }

    /// Evaluates `f` on every sample.
    pub fn map<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&TransitionMatrix, &StationaryDistribution) -> f64,
    {
        self.iter().map(|(t, pi)| f(t, pi)).collect()
    }

    /// Central percentile interval of a derived scalar at the given
    /// confidence (e.g. `0.95`). Non-finite values are ignored.
    pub fn quantile_interval<F>(&self, confidence: f64, f: F) -> Option<(f64, f64)>
    where
        F: Fn(&TransitionMatrix, &StationaryDistribution) -> f64,
    {
        percentile_interval(&self.map(f), confidence)
    }
}
