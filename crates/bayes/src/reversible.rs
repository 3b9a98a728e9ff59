//! Metropolis-within-Gibbs sampler for reversible transition matrices.
//!
//! The chain runs on an unnormalized symmetric flux matrix `X` restricted to
//! the pattern of `C + C^T` plus the diagonal. Every `X` with positive
//! pattern entries maps to a reversible `T = X / rowsum(X)` with
//! `pi ∝ rowsum(X)`. The target density on the pattern coordinates is
//!
//! ```text
//! g(X) ∝ prod_ij T_ij^(c_ij + prior) * exp(-S),   S = sum_ij x_ij
//! ```
//!
//! `S` only fixes the overall scale, which `T` ignores, and is sampled
//! exactly from `Gamma(d, 1)` with `d` the number of coordinates.

use msm_counts::CountMatrix;
use msm_estimate::{
    CancelToken, FixedPoint, StationaryDistribution, TransitionEstimator, TransitionMatrix,
};
use nalgebra::DMatrix;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma, StandardNormal};

use crate::config::BayesConfig;
use crate::error::BayesError;
use crate::sample::{ChainOutput, MoveStats};

/// Detailed-balance tolerance for recorded samples.
const BALANCE_TOL: f64 = 1e-10;

/// Fraction of the off-diagonal row mass given to an empty diagonal at start.
const DIAG_FLOOR: f64 = 1e-3;

struct Edge {
    i: usize,
    j: usize,
    /// Pseudo-count of `T_ij`.
    a_ij: f64,
    /// Pseudo-count of `T_ji`.
    a_ji: f64,
    /// Half-width of the uniform shift proposal.
    width: f64,
}

/// Current point of the chain plus the static pattern data.
pub(crate) struct FluxChain {
    edges: Vec<Edge>,
    /// `(neighbor, edge index)` per state.
    adjacency: Vec<Vec<(usize, usize)>>,
    a_diag: Vec<f64>,
    node_sigma: Vec<f64>,
    offdiag: Vec<f64>,
    diag: Vec<f64>,
    row: Vec<f64>,
    scale: Gamma<f64>,
    edge_stats: MoveStats,
    node_stats: MoveStats,
}

impl FluxChain {
    /// Builds the chain and places it at the reversible maximum-likelihood
    /// estimate, scaled to `S = d`.
    pub(crate) fn at_mle(counts: &CountMatrix, config: &BayesConfig) -> Result<Self, BayesError> {
        let n = counts.n_states();
        let prior = config.prior();

        let mle = TransitionEstimator::Reversible(FixedPoint {
            tol: 1e-10,
            max_iter: 100_000,
            damping: 0.0,
        })
        .estimate(counts)?;
        let pi = mle.stationary.as_slice();
        let t = &mle.transition;

        let mut edges = Vec::new();
        let mut adjacency = vec![Vec::new(); n];
        let mut offdiag = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let (c_ij, c_ji) = (counts.get(i, j), counts.get(j, i));
                if c_ij + c_ji == 0 {
                    continue;
                }
                let e = edges.len();
                adjacency[i].push((j, e));
                adjacency[j].push((i, e));
                offdiag.push(0.5 * (pi[i] * t.prob(i, j) + pi[j] * t.prob(j, i)));
                edges.push(Edge {
                    i,
                    j,
                    a_ij: c_ij as f64 + prior,
                    a_ji: c_ji as f64 + prior,
                    width: (1.0 + (c_ij + c_ji) as f64).sqrt().recip(),
                });
            }
        }
        if n > 1 {
            if let Some(state) = adjacency.iter().position(|adj| adj.is_empty()) {
                return Err(BayesError::IsolatedState { state });
            }
        }

        let mut diag: Vec<f64> = (0..n).map(|i| pi[i] * t.prob(i, i)).collect();
        for (i, d) in diag.iter_mut().enumerate() {
            let off: f64 = adjacency[i].iter().map(|&(_, e)| offdiag[e]).sum();
            if *d <= 0.0 {
                *d = if off > 0.0 { DIAG_FLOOR * off } else { 1.0 };
            }
        }

        let n_coords = (n + edges.len()) as f64;
        let scale = Gamma::new(n_coords, 1.0).map_err(|e| BayesError::InvalidConfig {
            reason: format!("scale distribution: {e}"),
        })?;
        let node_sigma = (0..n)
            .map(|i| {
                let exchanged: u64 = adjacency[i]
                    .iter()
                    .map(|&(k, _)| counts.get(i, k) + counts.get(k, i))
                    .sum();
                config.step_scale() / (1.0 + exchanged as f64).sqrt()
            })
            .collect();

        let mut chain = Self {
            a_diag: (0..n).map(|i| counts.get(i, i) as f64 + prior).collect(),
            edges,
            adjacency,
            node_sigma,
            offdiag,
            diag,
            row: vec![0.0; n],
            scale,
            edge_stats: MoveStats::default(),
            node_stats: MoveStats::default(),
        };
        chain.refresh_rows();
        let factor = n_coords / chain.total();
        chain.rescale(factor);
        for (edge, &x) in chain.edges.iter_mut().zip(&chain.offdiag) {
            edge.width *= config.step_scale() * x;
        }
        Ok(chain)
    }

    fn n_states(&self) -> usize {
        self.diag.len()
    }

    fn total(&self) -> f64 {
        self.row.iter().sum()
    }

    fn refresh_rows(&mut self) {
        for (k, adj) in self.adjacency.iter().enumerate() {
            self.row[k] = self.diag[k] + adj.iter().map(|&(_, e)| self.offdiag[e]).sum::<f64>();
        }
    }

    fn rescale(&mut self, factor: f64) {
        self.offdiag.iter_mut().for_each(|x| *x *= factor);
        self.diag.iter_mut().for_each(|x| *x *= factor);
        self.row.iter_mut().for_each(|x| *x *= factor);
    }

    /// `sum_l a_kl ln T_kl` for row `k`.
    fn row_log_likelihood(&self, k: usize) -> f64 {
        let denom = self.row[k].ln();
        let mut ll = term(self.a_diag[k], self.diag[k].ln() - denom);
        for &(_, e) in &self.adjacency[k] {
            let edge = &self.edges[e];
            let a = if edge.i == k { edge.a_ij } else { edge.a_ji };
            ll += term(a, self.offdiag[e].ln() - denom);
        }
        ll
    }

    /// Shifts mass between an edge and the two diagonal entries it joins.
    /// Row sums stay fixed, so only four entries of T change.
    fn edge_move(&mut self, e: usize, rng: &mut StdRng) {
        let edge = &self.edges[e];
        if !(edge.width > 0.0) {
            return;
        }
        let (i, j) = (edge.i, edge.j);
        let delta = rng.random_range(-edge.width..edge.width);
        let x = self.offdiag[e];
        let (x_new, di_new, dj_new) = (x + delta, self.diag[i] - delta, self.diag[j] - delta);
        self.edge_stats.proposed += 1;
        if x_new <= 0.0 || di_new <= 0.0 || dj_new <= 0.0 {
            return;
        }
        let log_alpha = term(edge.a_ij + edge.a_ji, (x_new / x).ln())
            + term(self.a_diag[i], (di_new / self.diag[i]).ln())
            + term(self.a_diag[j], (dj_new / self.diag[j]).ln());
        if accept(log_alpha, rng) {
            self.offdiag[e] = x_new;
            self.diag[i] = di_new;
            self.diag[j] = dj_new;
            self.edge_stats.accepted += 1;
        }
    }

    /// Log-normal rescale of every coordinate touching state `i`.
    fn node_move(&mut self, i: usize, rng: &mut StdRng) {
        let z: f64 = StandardNormal.sample(rng);
        let s = (self.node_sigma[i] * z).exp();
        self.node_stats.proposed += 1;

        let old_ll: f64 = self.adjacency[i]
            .iter()
            .map(|&(k, _)| self.row_log_likelihood(k))
            .sum();
        let old_diag = self.diag[i];
        let old_row = self.row[i];
        let mut old_off_sum = 0.0;
        for &(k, e) in &self.adjacency[i] {
            let x = self.offdiag[e];
            old_off_sum += x;
            self.offdiag[e] = s * x;
            self.row[k] += (s - 1.0) * x;
        }
        self.diag[i] = s * old_diag;
        self.row[i] = s * old_row;

        let new_ll: f64 = self.adjacency[i]
            .iter()
            .map(|&(k, _)| self.row_log_likelihood(k))
            .sum();
        let m = (1 + self.adjacency[i].len()) as f64;
        let delta_total = (s - 1.0) * (old_diag + 2.0 * old_off_sum);
        let log_alpha = new_ll - old_ll - delta_total + m * s.ln();

        if accept(log_alpha, rng) {
            self.node_stats.accepted += 1;
            return;
        }
        for &(k, e) in &self.adjacency[i] {
            let x = self.offdiag[e] / s;
            self.offdiag[e] = x;
            self.row[k] -= (s - 1.0) * x;
        }
        self.diag[i] = old_diag;
        self.row[i] = old_row;
    }

    /// Exact Gibbs draw of the overall scale.
    fn scale_move(&mut self, rng: &mut StdRng) {
        let target = self.scale.sample(rng);
        let factor = target / self.total();
        self.rescale(factor);
    }

    pub(crate) fn sweep(&mut self, rng: &mut StdRng) {
        for e in 0..self.edges.len() {
            self.edge_move(e, rng);
        }
        for i in 0..self.n_states() {
            self.node_move(i, rng);
        }
        self.scale_move(rng);
        self.refresh_rows();
    }

    /// Converts the current point to a validated transition matrix.
    pub(crate) fn record(
        &self,
        chain: usize,
        index: usize,
    ) -> Result<(TransitionMatrix, StationaryDistribution), BayesError> {
        let n = self.n_states();
        let mut probs = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            probs[(i, i)] = self.diag[i] / self.row[i];
        }
        for (edge, &x) in self.edges.iter().zip(&self.offdiag) {
            probs[(edge.i, edge.j)] = x / self.row[edge.i];
            probs[(edge.j, edge.i)] = x / self.row[edge.j];
        }
        let violation = |reason: String| BayesError::InvariantViolated {
            chain,
            index,
            reason,
        };
        let transition = TransitionMatrix::new(probs).map_err(|e| violation(e.to_string()))?;
        let stationary = StationaryDistribution::from_weights(self.row.clone())
            .map_err(|e| violation(e.to_string()))?;
        let imbalance = transition.detailed_balance_violation(stationary.as_slice());
        if imbalance > BALANCE_TOL {
            return Err(violation(format!("detailed balance violated by {imbalance}")));
        }
        Ok((transition, stationary))
    }
}

/// `a * ln_ratio` with `0 * ln 0 = 0`.
fn term(a: f64, ln_value: f64) -> f64 {
    if a == 0.0 { 0.0 } else { a * ln_value }
}

fn accept(log_alpha: f64, rng: &mut StdRng) -> bool {
    if log_alpha >= 0.0 {
        return true;
    }
    let u: f64 = rng.random();
    u.ln() < log_alpha
}

/// Runs one reversible chain and records `n_samples` matrices.
pub(crate) fn run_chain(
    counts: &CountMatrix,
    config: &BayesConfig,
    chain: usize,
    seed: u64,
    n_samples: usize,
    cancel: &CancelToken,
) -> Result<ChainOutput, BayesError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = FluxChain::at_mle(counts, config)?;

    for _ in 0..config.burn_in() {
        if cancel.is_cancelled() {
            return Err(BayesError::Cancelled);
        }
        state.sweep(&mut rng);
    }

    let mut out = ChainOutput::with_capacity(n_samples);
    for index in 0..n_samples {
        for _ in 0..config.thin() {
            if cancel.is_cancelled() {
                return Err(BayesError::Cancelled);
            }
            state.sweep(&mut rng);
        }
        let (t, pi) = state.record(chain, index)?;
        out.push(t, pi);
    }
    out.edge_stats = state.edge_stats;
    out.node_stats = state.node_stats;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn counts(dense: &[&[u64]]) -> CountMatrix {
        let rows: Vec<Vec<u64>> = dense.iter().map(|r| r.to_vec()).collect();
        CountMatrix::from_dense(&rows, 1).unwrap()
    }

    #[test]
    fn starts_at_scaled_mle() {
        let c = counts(&[&[50, 10, 0], &[8, 40, 5], &[0, 6, 30]]);
        let chain = FluxChain::at_mle(&c, &BayesConfig::new(1)).unwrap();
        // d = 3 diagonal + 2 edges
        assert_relative_eq!(chain.total(), 5.0, epsilon = 1e-10);
        let (t, pi) = chain.record(0, 0).unwrap();
        let mle = TransitionEstimator::Reversible(FixedPoint {
            tol: 1e-12,
            max_iter: 100_000,
            damping: 0.0,
        })
        .estimate(&c)
        .unwrap();
        for i in 0..3 {
            assert_relative_eq!(pi.get(i), mle.stationary.get(i), epsilon = 1e-8);
            for j in 0..3 {
                assert_relative_eq!(t.prob(i, j), mle.transition.prob(i, j), epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn sweeps_preserve_invariants() {
        let c = counts(&[&[50, 10, 0], &[8, 40, 5], &[0, 6, 30]]);
        let mut chain = FluxChain::at_mle(&c, &BayesConfig::new(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for k in 0..200 {
            chain.sweep(&mut rng);
            let (t, _) = chain.record(0, k).unwrap();
            // pattern zeros stay zero
            assert_eq!(t.prob(0, 2), 0.0);
        }
        assert!(chain.edge_stats.accepted > 0);
        assert!(chain.node_stats.accepted > 0);
    }

    #[test]
    fn edge_move_keeps_row_sums() {
        let c = counts(&[&[5, 10], &[10, 5]]);
        let mut chain = FluxChain::at_mle(&c, &BayesConfig::new(1)).unwrap();
        let before = chain.row.clone();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            chain.edge_move(0, &mut rng);
        }
        let after: Vec<f64> = (0..2)
            .map(|k| chain.diag[k] + chain.offdiag[0])
            .collect();
        for k in 0..2 {
            assert_relative_eq!(before[k], after[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn rejected_node_move_restores_state() {
        let c = counts(&[&[50, 10, 0], &[8, 40, 5], &[0, 6, 30]]);
        let mut chain = FluxChain::at_mle(&c, &BayesConfig::new(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            chain.node_move(1, &mut rng);
            let mut check = chain.row.clone();
            chain.refresh_rows();
            for (a, b) in check.iter_mut().zip(&chain.row) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn isolated_state_rejected() {
        let c = counts(&[&[5, 5, 0], &[5, 5, 0], &[0, 0, 3]]);
        assert!(matches!(
            FluxChain::at_mle(&c, &BayesConfig::new(1)),
            Err(BayesError::IsolatedState { state: 2 })
        ));
    }

    #[test]
    fn cancellation_stops_chain() {
        let c = counts(&[&[5, 10], &[10, 5]]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            run_chain(&c, &BayesConfig::new(5), 0, 1, 5, &cancel),
            Err(BayesError::Cancelled)
        ));
    }
}
