//! Row-stochastic transition matrices and their stationary distributions.

use nalgebra::{DMatrix, DVector};

use crate::error::EstimateError;

/// Tolerance on row sums and entry bounds when validating a matrix.
pub const STOCHASTIC_TOL: f64 = 1e-8;

/// A square row-stochastic transition matrix over a connected set.
///
/// Row `i` holds the probabilities of moving from the state at position `i`
/// of the connected set to every other position within one lag.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    probs: DMatrix<f64>,
}

impl TransitionMatrix {
    /// Wraps a matrix after checking it is row-stochastic.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidMatrix`] if the matrix is not square,
    /// is empty, has entries outside `[0, 1]` or rows that do not sum to 1.
    pub fn new(probs: DMatrix<f64>) -> Result<Self, EstimateError> {
        let tm = Self { probs };
        tm.validate()?;
        Ok(tm)
    }

    /// Builds a transition matrix from row-major rows.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidMatrix`] for ragged input or any
    /// failure of [`TransitionMatrix::validate`].
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, EstimateError> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(EstimateError::InvalidMatrix {
                reason: format!("row {i} has {} entries, expected {n}", row.len()),
            });
        }
        Self::new(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }

    /// Wraps a matrix the caller has already normalized.
    pub(crate) fn from_matrix_unchecked(probs: DMatrix<f64>) -> Self {
        Self { probs }
    }

    /// Returns the number of states.
    pub fn n_states(&self) -> usize {
        self.probs.nrows()
    }

    /// Returns the probability of moving from position `i` to position `j`.
    pub fn prob(&self, i: usize, j: usize) -> f64 {
        self.probs[(i, j)]
    }

    /// Returns row `i` as a vector.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.probs.row(i).iter().copied().collect()
    }

    /// Returns the matrix as row-major rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_states()).map(|i| self.row(i)).collect()
    }

    /// Returns the underlying matrix.
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.probs
    }

    /// Validates that the matrix is row-stochastic.
    ///
    /// Checks that it is square and non-empty, all values are finite and in
    /// `[0, 1]`, and each row sums to 1 within [`STOCHASTIC_TOL`].
    pub fn validate(&self) -> Result<(), EstimateError> {
        let (nr, nc) = self.probs.shape();
        if nr == 0 || nr != nc {
            return Err(EstimateError::InvalidMatrix {
                reason: format!("expected a non-empty square matrix, got {nr}x{nc}"),
            });
        }
        for i in 0..nr {
            let mut sum = 0.0;
            for j in 0..nc {
                let p = self.probs[(i, j)];
                if !p.is_finite() {
                    return Err(EstimateError::InvalidMatrix {
                        reason: format!("T[{i}][{j}] is not finite: {p}"),
                    });
                }
                if !(-STOCHASTIC_TOL..=1.0 + STOCHASTIC_TOL).contains(&p) {
                    return Err(EstimateError::InvalidMatrix {
                        reason: format!("T[{i}][{j}] = {p} is outside [0, 1]"),
                    });
                }
                sum += p;
            }
            if (sum - 1.0).abs() > STOCHASTIC_TOL {
                return Err(EstimateError::InvalidMatrix {
                    reason: format!("row {i} sums to {sum}, expected 1"),
                });
            }
        }
        Ok(())
    }

    /// Returns the largest detailed-balance violation
    /// `max |pi_i T_ij - pi_j T_ji|` with respect to `pi`.
    ///
    /// # Panics
    ///
    /// Panics if `pi` does not have one entry per state.
    pub fn detailed_balance_violation(&self, pi: &[f64]) -> f64 {
        let n = self.n_states();
        assert_eq!(pi.len(), n, "pi must have one entry per state");
        let mut worst: f64 = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let flux = pi[i] * self.probs[(i, j)] - pi[j] * self.probs[(j, i)];
                worst = worst.max(flux.abs());
            }
        }
        worst
    }

    /// Returns `T^m` by repeated squaring. `T^0` is the identity.
    pub fn power(&self, m: u32) -> TransitionMatrix {
        let n = self.n_states();
        let mut result = DMatrix::<f64>::identity(n, n);
        let mut base = self.probs.clone();
        let mut e = m;
        while e > 0 {
            if e & 1 == 1 {
                result = &result * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        Self::from_matrix_unchecked(result)
    }

    /// Computes the stationary distribution (left eigenvector for eigenvalue 1).
    ///
    /// Solves `pi (T - I) = 0` with the normalization `sum(pi) = 1` replacing
    /// the last equation. Tiny negative round-off is clipped to zero.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidMatrix`] if the system is singular,
    /// which happens when T has more than one closed class.
    pub fn stationary_distribution(&self) -> Result<StationaryDistribution, EstimateError> {
        let n = self.n_states();
        let mut a = self.probs.transpose() - DMatrix::<f64>::identity(n, n);
        a.row_mut(n - 1).fill(1.0);
        let mut b = DVector::<f64>::zeros(n);
        b[n - 1] = 1.0;

        let pi = a.lu().solve(&b).ok_or_else(|| EstimateError::InvalidMatrix {
            reason: "stationary system is singular (more than one closed class)".to_string(),
        })?;
        StationaryDistribution::from_weights(pi.iter().map(|&p| p.max(0.0)).collect())
    }

    /// Samples the next position given the current one, using the cumulative
    /// distribution of row `from`.
    ///
    /// Falls back to the last state with positive probability if rounding
    /// prevents a match.
    pub fn sample(&self, from: usize, rng: &mut impl rand::Rng) -> usize {
        let u: f64 = rng.random();
        let mut cumulative = 0.0;
        let mut last_positive = from;
        for j in 0..self.n_states() {
            let p = self.probs[(from, j)];
            if p > 0.0 {
                last_positive = j;
            }
            cumulative += p;
            if cumulative >= u && p > 0.0 {
                return j;
            }
        }
        last_positive
    }
}

/// A probability vector invariant under a transition matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StationaryDistribution {
    probs: Vec<f64>,
}

impl StationaryDistribution {
    /// Normalizes non-negative weights into a distribution.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidMatrix`] if any weight is negative or
    /// non-finite, or all weights are zero.
    pub fn from_weights(weights: Vec<f64>) -> Result<Self, EstimateError> {
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EstimateError::InvalidMatrix {
                reason: format!("stationary weight {bad} is negative or not finite"),
            });
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(EstimateError::InvalidMatrix {
                reason: "stationary weights sum to zero".to_string(),
            });
        }
        Ok(Self {
            probs: weights.into_iter().map(|w| w / total).collect(),
        })
    }

    /// Returns the probabilities.
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    /// Returns the probability of position `i`.
    pub fn get(&self, i: usize) -> f64 {
        self.probs[i]
    }

    /// Returns the number of states.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// Returns true if the distribution has no states.
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Returns true if every entry is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.probs.iter().all(|&p| p > 0.0)
    }
}
