//! Exact sampling of non-reversible transition matrices.
//!
//! Each row is an independent `Dirichlet(c_ij + prior)` over the entries with
//! a positive count, drawn as normalized `Gamma(alpha, 1)` variates.

use msm_counts::CountMatrix;
use msm_estimate::{CancelToken, TransitionMatrix};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma};

use crate::config::BayesConfig;
use crate::error::BayesError;
use crate::sample::ChainOutput;

type RowPosterior = Vec<(usize, Gamma<f64>)>;

fn row_posteriors(counts: &CountMatrix, prior: f64) -> Result<Vec<RowPosterior>, BayesError> {
    (0..counts.n_states())
        .map(|i| {
            counts
                .row(i)
                .map(|(j, c)| {
                    Gamma::new(c as f64 + prior, 1.0)
                        .map(|g| (j, g))
                        .map_err(|e| BayesError::InvalidConfig {
                            reason: format!("Dirichlet parameter for ({i}, {j}): {e}"),
                        })
                })
                .collect()
        })
        .collect()
}

/// Runs one chain of independent Dirichlet-row draws.
pub(crate) fn run_chain(
    counts: &CountMatrix,
    config: &BayesConfig,
    chain: usize,
    seed: u64,
    n_samples: usize,
    cancel: &CancelToken,
) -> Result<ChainOutput, BayesError> {
    let n = counts.n_states();
    let rows = row_posteriors(counts, config.prior())?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = ChainOutput::with_capacity(n_samples);

    for index in 0..n_samples {
        if cancel.is_cancelled() {
            return Err(BayesError::Cancelled);
        }
        let mut probs = DMatrix::<f64>::zeros(n, n);
        for (i, row) in rows.iter().enumerate() {
            if row.is_empty() {
                probs[(i, i)] = 1.0;
                continue;
            }
            let draws: Vec<f64> = row.iter().map(|(_, g)| g.sample(&mut rng)).collect();
            let total: f64 = draws.iter().sum();
            for ((j, _), w) in row.iter().zip(&draws) {
                probs[(i, *j)] = w / total;
            }
        }
        let violation = |reason: String| BayesError::InvariantViolated {
            chain,
            index,
            reason,
        };
        let transition = TransitionMatrix::new(probs).map_err(|e| violation(e.to_string()))?;
        let stationary = transition
            .stationary_distribution()
            .map_err(|e| violation(e.to_string()))?;
        out.push(transition, stationary);
    }
    Ok(out)
}
