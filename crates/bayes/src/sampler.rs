//! Parallel posterior sampling entry points.

use msm_counts::CountMatrix;
use msm_estimate::{CancelToken, MarkovStateModel, Reversibility};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::BayesConfig;
use crate::error::BayesError;
use crate::sample::BayesianSample;
use crate::{nonreversible, reversible};

/// Seed of chain `chain` given the base seed.
pub fn chain_seed(seed: u64, chain: usize) -> u64 {
    seed.wrapping_add((chain as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Draws `config.n_samples()` transition matrices from the posterior given
/// a (connected, restricted) count matrix.
///
/// Chains run in parallel. The result depends only on the counts and the
/// configuration: chain `c` is seeded with [`chain_seed`] and the samples
/// are concatenated in chain order.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`BayesError::InvalidConfig`] | `config.validate()` fails or the counts are empty |
/// | [`BayesError::IsolatedState`] | reversible sampling with a state that has no off-diagonal counts |
/// | [`BayesError::Estimate`] | the reversible starting point could not be estimated |
/// | [`BayesError::InvariantViolated`] | a recorded sample failed validation |
/// | [`BayesError::Cancelled`] | `cancel` was triggered |
#[tracing::instrument(skip(counts, config, cancel), fields(n_states = counts.n_states(), n_samples = config.n_samples()))]
pub fn sample_posterior(
    counts: &CountMatrix,
    reversibility: Reversibility,
    config: &BayesConfig,
    cancel: &CancelToken,
) -> Result<BayesianSample, BayesError> {
    config.validate()?;
    if counts.n_states() == 0 {
        return Err(BayesError::InvalidConfig {
            reason: "count matrix has no states".to_string(),
        });
    }

    let chains = (0..config.chains())
        .into_par_iter()
        .map(|chain| {
            let seed = chain_seed(config.seed(), chain);
            let n = config.samples_for_chain(chain);
            debug!(chain, seed, n, "chain started");
            match reversibility {
                Reversibility::Reversible => {
                    reversible::run_chain(counts, config, chain, seed, n, cancel)
                }
                Reversibility::NonReversible => {
                    nonreversible::run_chain(counts, config, chain, seed, n, cancel)
                }
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let sample = BayesianSample::from_chains(chains);
    info!(
        n_samples = sample.len(),
        edge_acceptance = sample.edge_moves().rate(),
        node_acceptance = sample.node_moves().rate(),
        "posterior sampled"
    );
    Ok(sample)
}

/// Samples the posterior of an estimated model's count matrix, with the
/// model's reversibility.
pub fn sample_model(
    msm: &MarkovStateModel,
    config: &BayesConfig,
    cancel: &CancelToken,
) -> Result<BayesianSample, BayesError> {
    sample_posterior(msm.counts(), msm.reversibility(), config, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_seeds_differ() {
        let seeds: Vec<u64> = (0..4).map(|c| chain_seed(7, c)).collect();
        assert_eq!(seeds[0], 7);
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_ne!(seeds[i], seeds[j]);
            }
        }
    }

    #[test]
    fn invalid_config_rejected() {
        let c = CountMatrix::from_dense(&[vec![1, 1], vec![1, 1]], 1).unwrap();
        let result = sample_posterior(
            &c,
            Reversibility::Reversible,
            &BayesConfig::new(0),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(BayesError::InvalidConfig { .. })));
    }
}
