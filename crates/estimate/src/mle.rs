//! Maximum-likelihood transition matrix estimation.
//!
//! Two strategies, fixed when the estimator is built:
//!
//! - **Non-reversible**: `T_ij = C_ij / sum_k C_ik`, closed form.
//! - **Reversible**: self-consistent iteration on the symmetric flux matrix
//!   `X` (`x_ij = pi_i T_ij`) restricted to the sparsity pattern of `C + C^T`.

use msm_counts::CountMatrix;
use nalgebra::DMatrix;
use tracing::{debug, warn};

use crate::config::{EstimatorConfig, Reversibility};
use crate::error::EstimateError;
use crate::transition::{StationaryDistribution, TransitionMatrix};

/// Outcome of the estimator's termination check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convergence {
    /// Closed-form estimate; no iteration was needed.
    Closed,
    /// The maximum entrywise change in T fell below the tolerance.
    Converged {
        /// Iterations performed.
        iterations: usize,
        /// Change at the final iteration.
        max_change: f64,
    },
    /// The iteration budget ran out. The returned matrix is the iterate
    /// with the smallest change seen.
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Smallest change seen.
        max_change: f64,
    },
}

impl Convergence {
    /// Returns false only for [`Convergence::NotConverged`].
    pub fn is_converged(&self) -> bool {
        !matches!(self, Self::NotConverged { .. })
    }

    /// Returns the number of iterations (0 for closed-form estimates).
    pub fn iterations(&self) -> usize {
        match *self {
            Self::Closed => 0,
            Self::Converged { iterations, .. } | Self::NotConverged { iterations, .. } => {
                iterations
            }
        }
    }
}

/// Parameters of the reversible fixed-point iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPoint {
    /// Convergence threshold on the maximum entrywise change in T.
    pub tol: f64,
    /// Iteration budget.
    pub max_iter: usize,
    /// Weight of the previous iterate, in `[0, 1)`.
    pub damping: f64,
}

/// Result of a single estimation.
#[derive(Debug, Clone)]
pub struct Estimate {
    /// Row-stochastic transition matrix over the input's states.
    pub transition: TransitionMatrix,
    /// Stationary distribution of `transition`.
    pub stationary: StationaryDistribution,
    /// Termination report.
    pub convergence: Convergence,
}

/// Transition matrix estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionEstimator {
    /// Row-normalized counts.
    NonReversible,
    /// Detailed-balance constrained maximum likelihood.
    Reversible(FixedPoint),
}

impl TransitionEstimator {
    /// Selects the strategy described by `config`.
    pub fn from_config(config: &EstimatorConfig) -> Self {
        match config.reversibility() {
            Reversibility::NonReversible => Self::NonReversible,
            Reversibility::Reversible => Self::Reversible(FixedPoint {
                tol: config.tol(),
                max_iter: config.max_iter(),
                damping: config.damping(),
            }),
        }
    }

    /// Returns true for the reversible strategy.
    pub fn is_reversible(&self) -> bool {
        matches!(self, Self::Reversible(_))
    }

    /// Estimates a transition matrix from a (restricted) count matrix.
    ///
    /// States with no outgoing counts get a self-loop of probability 1.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`EstimateError::InvalidMatrix`] | count matrix is empty, or the stationary system is singular |
    /// | [`EstimateError::NumericalInstability`] | a reversible weight became non-positive or non-finite |
    pub fn estimate(&self, counts: &CountMatrix) -> Result<Estimate, EstimateError> {
        if counts.n_states() == 0 {
            return Err(EstimateError::InvalidMatrix {
                reason: "count matrix has no states".to_string(),
            });
        }
        match self {
            Self::NonReversible => estimate_nonreversible(counts),
            Self::Reversible(fp) => estimate_reversible(counts, fp),
        }
    }
}

fn estimate_nonreversible(counts: &CountMatrix) -> Result<Estimate, EstimateError> {
    let n = counts.n_states();
    let mut probs = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        let total = counts.row_sum(i);
        if total == 0 {
            probs[(i, i)] = 1.0;
            continue;
        }
        for (j, c) in counts.row(i) {
            probs[(i, j)] = c as f64 / total as f64;
        }
    }
    let transition = TransitionMatrix::from_matrix_unchecked(probs);
    let stationary = transition.stationary_distribution()?;
    debug!(n_states = n, "non-reversible estimate");
    Ok(Estimate {
        transition,
        stationary,
        convergence: Convergence::Closed,
    })
}

/// Symmetric sparsity pattern of `C + C^T` over `i <= j`.
struct FluxPattern {
    n: usize,
    /// `(i, j, c_ij + c_ji)` with `i <= j`.
    edges: Vec<(usize, usize, f64)>,
    /// Row sums of C.
    out_counts: Vec<f64>,
    /// States touching at least one edge.
    active: Vec<bool>,
}

impl FluxPattern {
    fn new(counts: &CountMatrix) -> Self {
        let n = counts.n_states();
        let mut edges = Vec::new();
        let mut active = vec![false; n];
        for i in 0..n {
            for (j, c) in counts.row(i) {
                if j < i {
                    // already visited as (j, i) unless C_ji == 0
                    if counts.get(j, i) > 0 {
                        continue;
                    }
                    edges.push((j, i, c as f64));
                } else {
                    let s = c + if j == i { c } else { counts.get(j, i) };
                    edges.push((i, j, s as f64));
                }
                active[i] = true;
                active[j] = true;
            }
        }
        edges.sort_by_key(|&(i, j, _)| (i, j));
        let out_counts = (0..n).map(|i| counts.row_sum(i) as f64).collect();
        Self {
            n,
            edges,
            out_counts,
            active,
        }
    }

    fn row_sums(&self, flux: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0; self.n];
        for (&(i, j, _), &x) in self.edges.iter().zip(flux) {
            sums[i] += x;
            if i != j {
                sums[j] += x;
            }
        }
        sums
    }

    /// One Jacobi sweep of `x_ij <- s_ij / (c_i / x_i + c_j / x_j)`.
    fn update(&self, flux: &[f64], weights: &[f64]) -> Vec<f64> {
        self.edges
            .iter()
            .map(|&(i, j, s)| {
                s / (self.out_counts[i] / weights[i] + self.out_counts[j] / weights[j])
            })
            .collect()
    }

    /// Advances one damped step from `(flux, weights)`.
    ///
    /// The returned change is that of the undamped sweep, so damping slows
    /// the iteration without loosening the convergence test.
    fn step(&self, flux: &[f64], weights: &[f64], damping: f64) -> (Vec<f64>, Vec<f64>, f64) {
        let sweep = self.update(flux, weights);
        let change = self.max_change((flux, weights), (&sweep, &self.row_sums(&sweep)));
        let next: Vec<f64> = if damping == 0.0 {
            sweep
        } else {
            sweep
                .iter()
                .zip(flux)
                .map(|(&new, &old)| (1.0 - damping) * new + damping * old)
                .collect()
        };
        let weights = self.row_sums(&next);
        (next, weights, change)
    }

    /// Maximum entrywise change in T between two iterates.
    fn max_change(&self, a: (&[f64], &[f64]), b: (&[f64], &[f64])) -> f64 {
        let (flux_a, w_a) = a;
        let (flux_b, w_b) = b;
        let mut worst: f64 = 0.0;
        for (k, &(i, j, _)) in self.edges.iter().enumerate() {
            worst = worst.max((flux_a[k] / w_a[i] - flux_b[k] / w_b[i]).abs());
            if i != j {
                worst = worst.max((flux_a[k] / w_a[j] - flux_b[k] / w_b[j]).abs());
            }
        }
        worst
    }

    fn check_weights(&self, weights: &[f64], iteration: usize) -> Result<(), EstimateError> {
        for (state, (&w, &active)) in weights.iter().zip(&self.active).enumerate() {
            if active && !(w.is_finite() && w > 0.0) {
                return Err(EstimateError::NumericalInstability {
                    iteration,
                    state,
                    value: w,
                });
            }
        }
        Ok(())
    }

    fn transition(&self, flux: &[f64], weights: &[f64]) -> TransitionMatrix {
        let mut probs = DMatrix::<f64>::zeros(self.n, self.n);
        for (&(i, j, _), &x) in self.edges.iter().zip(flux) {
            probs[(i, j)] = x / weights[i];
            if i != j {
                probs[(j, i)] = x / weights[j];
            }
        }
        for (i, &active) in self.active.iter().enumerate() {
            if !active {
                probs[(i, i)] = 1.0;
            }
        }
        TransitionMatrix::from_matrix_unchecked(probs)
    }
}

/// Iterate of the reversible fixed-point loop.
struct FixedPointState {
    iteration: usize,
    flux: Vec<f64>,
    weights: Vec<f64>,
    best_change: f64,
    best: Option<(Vec<f64>, Vec<f64>)>,
}

impl FixedPointState {
    fn start(pattern: &FluxPattern) -> Self {
        let flux: Vec<f64> = pattern.edges.iter().map(|&(_, _, s)| s).collect();
        let weights = pattern.row_sums(&flux);
        Self {
            iteration: 0,
            flux,
            weights,
            best_change: f64::INFINITY,
            best: None,
        }
    }

    fn advance(&mut self, flux: Vec<f64>, weights: Vec<f64>, change: f64) {
        self.iteration += 1;
        if change < self.best_change {
            self.best_change = change;
            self.best = Some((flux.clone(), weights.clone()));
        }
        self.flux = flux;
        self.weights = weights;
    }

    fn is_converged(&self, change: f64, tol: f64) -> bool {
        change < tol
    }

    fn is_exhausted(&self, max_iter: usize) -> bool {
        self.iteration >= max_iter
    }
}

fn estimate_reversible(counts: &CountMatrix, fp: &FixedPoint) -> Result<Estimate, EstimateError> {
    let pattern = FluxPattern::new(counts);
    let mut state = FixedPointState::start(&pattern);
    pattern.check_weights(&state.weights, 0)?;

    let convergence = loop {
        let (flux, weights, change) = pattern.step(&state.flux, &state.weights, fp.damping);
        pattern.check_weights(&weights, state.iteration + 1)?;
        state.advance(flux, weights, change);

        if state.is_converged(change, fp.tol) {
            break Convergence::Converged {
                iterations: state.iteration,
                max_change: change,
            };
        }
        if state.is_exhausted(fp.max_iter) {
            warn!(
                iterations = state.iteration,
                best_change = state.best_change,
                tol = fp.tol,
                "reversible estimator did not converge; returning best iterate"
            );
            if let Some((flux, weights)) = state.best.take() {
                state.flux = flux;
                state.weights = weights;
            }
            break Convergence::NotConverged {
                iterations: state.iteration,
                max_change: state.best_change,
            };
        }
    };

    let transition = pattern.transition(&state.flux, &state.weights);
    let stationary = StationaryDistribution::from_weights(state.weights)?;
    debug!(
        n_states = pattern.n,
        n_edges = pattern.edges.len(),
        iterations = convergence.iterations(),
        "reversible estimate"
    );
    Ok(Estimate {
        transition,
        stationary,
        convergence,
    })
}

/// Log-likelihood `sum_ij C_ij ln T_ij` of a count matrix under `T`.
///
/// Terms with `C_ij = 0` contribute nothing; a positive count on a zero
/// probability gives negative infinity.
///
/// # Panics
///
/// Panics if the two matrices have different sizes.
pub fn log_likelihood(counts: &CountMatrix, transition: &TransitionMatrix) -> f64 {
    assert_eq!(counts.n_states(), transition.n_states(), "size mismatch");
    counts
        .entries()
        .map(|(i, j, c)| {
            let p = transition.prob(i, j);
            if p > 0.0 {
                c as f64 * p.ln()
            } else {
                f64::NEG_INFINITY
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn counts(dense: &[&[u64]]) -> CountMatrix {
        let rows: Vec<Vec<u64>> = dense.iter().map(|r| r.to_vec()).collect();
        CountMatrix::from_dense(&rows, 1).unwrap()
    }

    fn reversible() -> TransitionEstimator {
        TransitionEstimator::from_config(&EstimatorConfig::new(1))
    }

    fn nonreversible() -> TransitionEstimator {
        TransitionEstimator::from_config(
            &EstimatorConfig::new(1).with_reversibility(Reversibility::NonReversible),
        )
    }

    // 1. nonreversible_row_normalization
    #[test]
    fn nonreversible_row_normalization() {
        let c = counts(&[&[8, 2], &[3, 7]]);
        let est = nonreversible().estimate(&c).unwrap();
        assert_relative_eq!(est.transition.prob(0, 1), 0.2, epsilon = 1e-15);
        assert_relative_eq!(est.transition.prob(1, 0), 0.3, epsilon = 1e-15);
        assert_eq!(est.convergence, Convergence::Closed);
        // pi = (0.3, 0.2) / 0.5
        assert_relative_eq!(est.stationary.get(0), 0.6, epsilon = 1e-12);
    }

    // 2. nonreversible_zero_row_self_loop
    #[test]
    fn nonreversible_zero_row_self_loop() {
        let c = counts(&[&[0, 5], &[0, 0]]);
        let est = nonreversible().estimate(&c).unwrap();
        assert_eq!(est.transition.prob(1, 1), 1.0);
        assert_relative_eq!(est.stationary.get(1), 1.0, epsilon = 1e-12);
    }

    // 3. reversible_symmetric_counts_match_row_normalization
    #[test]
    fn reversible_symmetric_counts_match_row_normalization() {
        // Symmetric counts already satisfy detailed balance.
        let c = counts(&[&[10, 4, 0], &[4, 6, 2], &[0, 2, 8]]);
        let rev = reversible().estimate(&c).unwrap();
        let nonrev = nonreversible().estimate(&c).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    rev.transition.prob(i, j),
                    nonrev.transition.prob(i, j),
                    epsilon = 1e-8
                );
            }
        }
        assert!(rev.convergence.is_converged());
    }

    // 4. reversible_two_state_closed_form
    #[test]
    fn reversible_two_state_closed_form() {
        // Any 2-state chain is reversible, so the constrained MLE equals the
        // row-normalized counts.
        let c = counts(&[&[90, 10], &[30, 70]]);
        let est = reversible().estimate(&c).unwrap();
        assert_relative_eq!(est.transition.prob(0, 1), 0.1, epsilon = 1e-8);
        assert_relative_eq!(est.transition.prob(1, 0), 0.3, epsilon = 1e-8);
        assert_relative_eq!(est.stationary.get(0), 0.75, epsilon = 1e-8);
    }

    // 5. reversible_detailed_balance_on_asymmetric_counts
    #[test]
    fn reversible_detailed_balance_on_asymmetric_counts() {
        let c = counts(&[&[5, 10, 1], &[2, 5, 10], &[10, 2, 5]]);
        let est = reversible().estimate(&c).unwrap();
        est.transition.validate().unwrap();
        let pi = est.stationary.as_slice();
        assert!(pi.iter().all(|&p| p > 0.0));
        assert!(est.transition.detailed_balance_violation(pi) < 1e-10);
    }

    // 6. reversible_pi_is_stationary
    #[test]
    fn reversible_pi_is_stationary() {
        let c = counts(&[&[5, 10, 1], &[2, 5, 10], &[10, 2, 5]]);
        let est = reversible().estimate(&c).unwrap();
        let solved = est.transition.stationary_distribution().unwrap();
        for i in 0..3 {
            assert_relative_eq!(est.stationary.get(i), solved.get(i), epsilon = 1e-8);
        }
    }

    // 7. budget_exhaustion_is_reported
    #[test]
    fn budget_exhaustion_is_reported() {
        let c = counts(&[&[5, 10, 1], &[2, 5, 10], &[10, 2, 5]]);
        let config = EstimatorConfig::new(1).with_max_iter(2).with_tol(1e-15);
        let est = TransitionEstimator::from_config(&config).estimate(&c).unwrap();
        match est.convergence {
            Convergence::NotConverged { iterations, max_change } => {
                assert_eq!(iterations, 2);
                assert!(max_change > 1e-15);
            }
            other => panic!("expected NotConverged, got {other:?}"),
        }
        est.transition.validate().unwrap();
    }

    // 8. damping_reaches_same_fixed_point
    #[test]
    fn damping_reaches_same_fixed_point() {
        let c = counts(&[&[5, 10, 1], &[2, 5, 10], &[10, 2, 5]]);
        let plain = reversible().estimate(&c).unwrap();
        let damped = TransitionEstimator::from_config(&EstimatorConfig::new(1).with_damping(0.5))
            .estimate(&c)
            .unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    plain.transition.prob(i, j),
                    damped.transition.prob(i, j),
                    epsilon = 1e-7
                );
            }
        }
    }

    // 8b. damped_step_reports_undamped_change
    #[test]
    fn damped_step_reports_undamped_change() {
        let c = counts(&[&[5, 10, 1], &[2, 5, 10], &[10, 2, 5]]);
        let pattern = FluxPattern::new(&c);
        let start = FixedPointState::start(&pattern);
        let (plain_flux, _, plain) = pattern.step(&start.flux, &start.weights, 0.0);
        let (damped_flux, _, damped) = pattern.step(&start.flux, &start.weights, 0.9);
        assert!(plain > 0.0);
        assert_eq!(plain, damped);
        for ((&p, &d), &old) in plain_flux.iter().zip(&damped_flux).zip(&start.flux) {
            assert_relative_eq!(d, 0.1 * p + 0.9 * old, epsilon = 1e-12);
        }
    }

    // 8c. heavy_damping_on_metastable_counts
    #[test]
    fn heavy_damping_on_metastable_counts() {
        let c = counts(&[
            &[5000, 7, 0, 1],
            &[3, 5000, 2, 0],
            &[0, 6, 5000, 4],
            &[2, 0, 5, 5000],
        ]);
        let config = EstimatorConfig::new(1).with_max_iter(2_000_000);
        let plain = TransitionEstimator::from_config(&config).estimate(&c).unwrap();
        let damped = TransitionEstimator::from_config(&config.clone().with_damping(0.9))
            .estimate(&c)
            .unwrap();
        assert!(plain.convergence.is_converged());
        assert!(damped.convergence.is_converged());
        for i in 0..4 {
            assert_relative_eq!(
                plain.stationary.get(i),
                damped.stationary.get(i),
                epsilon = 1e-6
            );
            for j in 0..4 {
                assert_relative_eq!(
                    plain.transition.prob(i, j),
                    damped.transition.prob(i, j),
                    epsilon = 1e-6
                );
            }
        }
    }

    // 9. one_directional_edge_enters_pattern
    #[test]
    fn one_directional_edge_enters_pattern() {
        // C_20 > 0 with C_02 == 0: edge (0, 2) must still exist in X.
        let c = counts(&[&[3, 4, 0], &[4, 3, 4], &[2, 4, 3]]);
        let est = reversible().estimate(&c).unwrap();
        assert!(est.transition.prob(0, 2) > 0.0);
        assert!(est.transition.prob(2, 0) > 0.0);
    }

    // 10. empty_counts_rejected
    #[test]
    fn empty_counts_rejected() {
        let c = CountMatrix::zeros(0, 1);
        assert!(matches!(
            reversible().estimate(&c),
            Err(EstimateError::InvalidMatrix { .. })
        ));
    }

    // 11. log_likelihood_prefers_mle
    #[test]
    fn log_likelihood_prefers_mle() {
        let c = counts(&[&[8, 2], &[3, 7]]);
        let mle = nonreversible().estimate(&c).unwrap();
        let other = TransitionMatrix::from_rows(&[vec![0.5, 0.5], vec![0.5, 0.5]]).unwrap();
        assert!(log_likelihood(&c, &mle.transition) > log_likelihood(&c, &other));
        let zero = TransitionMatrix::from_rows(&[vec![1.0, 0.0], vec![0.5, 0.5]]).unwrap();
        assert_eq!(log_likelihood(&c, &zero), f64::NEG_INFINITY);
    }
}
