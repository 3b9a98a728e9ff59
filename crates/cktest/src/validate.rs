//! The Chapman-Kolmogorov test.

use msm_bayes::{BayesConfig, BayesError, BayesianSample, sample_model};
use msm_counts::DiscreteTrajectory;
use msm_estimate::{CancelToken, MarkovStateModel, estimate_msm};
use msm_stats::{intervals_overlap, percentile_interval};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::coarse::{CoarseMap, labels_of, project};
use crate::config::CkConfig;
use crate::error::CkError;
use crate::result::{CkEntry, CkResult, CkStep};

/// Compares `T(tau)^m`, projected onto coarse sets, with models re-estimated
/// at lag `m * tau`.
///
/// Without posterior sampling two probabilities agree when they differ by at
/// most `config.tolerance()`. With sampling (`config.bayes()`), they agree
/// when their percentile intervals overlap. A coarse pair missing from the
/// re-estimated model never agrees. Disagreement is reported, not an error.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`CkError::InvalidConfig`] | `config.validate()` fails or `m * tau` overflows |
/// | [`CkError::IncompleteCoarseMap`] | an active state of `msm` has no coarse label |
/// | [`CkError::Estimate`] | re-estimation at some `m * tau` failed |
/// | [`CkError::Bayes`] | posterior sampling failed |
/// | [`CkError::Cancelled`] | `cancel` was triggered |
#[tracing::instrument(skip_all, fields(lag = msm.lag(), n_multipliers = config.multipliers().len()))]
pub fn ck_test(
    msm: &MarkovStateModel,
    trajectories: &[DiscreteTrajectory],
    coarse_map: &CoarseMap,
    config: &CkConfig,
    cancel: &CancelToken,
) -> Result<CkResult, CkError> {
    config.validate()?;
    let coarse = coarse_map.coarse_states(msm)?;
    let base_sample = config
        .bayes()
        .map(|bayes| sample_or_cancel(msm, bayes, cancel))
        .transpose()?;

    let steps = config
        .multipliers()
        .par_iter()
        .map(|&m| {
            run_step(
                msm,
                base_sample.as_ref(),
                trajectories,
                coarse_map,
                &coarse,
                m,
                config,
                cancel,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = CkResult {
        lag: msm.lag(),
        coarse_states: coarse,
        tolerance: config.tolerance(),
        confidence: config.bayes().map(|_| config.confidence()),
        steps,
    };
    info!(n_disagreements = result.n_disagreements(), "CK test finished");
    Ok(result)
}

/// Lag of the `m`-th multiple of `lag`, rejecting overflow.
fn step_lag(lag: usize, m: u32) -> Result<usize, CkError> {
    usize::try_from(m)
        .ok()
        .and_then(|m| lag.checked_mul(m))
        .ok_or_else(|| CkError::InvalidConfig {
            reason: format!("lag {lag} times multiplier {m} overflows"),
        })
}

fn sample_or_cancel(
    msm: &MarkovStateModel,
    bayes: &BayesConfig,
    cancel: &CancelToken,
) -> Result<BayesianSample, CkError> {
    sample_model(msm, bayes, cancel).map_err(|e| match e {
        BayesError::Cancelled => CkError::Cancelled,
        other => CkError::Bayes(other),
    })
}

#[allow(clippy::too_many_arguments)]
fn run_step(
    msm: &MarkovStateModel,
    base_sample: Option<&BayesianSample>,
    trajectories: &[DiscreteTrajectory],
    coarse_map: &CoarseMap,
    coarse: &[usize],
    m: u32,
    config: &CkConfig,
    cancel: &CancelToken,
) -> Result<CkStep, CkError> {
    if cancel.is_cancelled() {
        return Err(CkError::Cancelled);
    }
    let lag = step_lag(msm.lag(), m)?;
    let labels = labels_of(msm);
    let predicted = project(
        &msm.transition().power(m),
        msm.stationary(),
        &labels,
        coarse_map,
        coarse,
    );

    let long = estimate_msm(trajectories, &config.estimator().at_lag(lag))?;
    let long_labels = labels_of(&long);
    let estimated = project(
        long.transition(),
        long.stationary(),
        &long_labels,
        coarse_map,
        coarse,
    );

    let intervals = match (config.bayes(), base_sample) {
        (Some(bayes), Some(base)) => {
            let long_sample = sample_or_cancel(&long, bayes, cancel)?;
            let confidence = config.confidence();
            let pred = sample_intervals(base, m, &labels, coarse_map, coarse, confidence);
            let est = sample_intervals(
                &long_sample,
                1,
                &long_labels,
                coarse_map,
                coarse,
                confidence,
            );
            Some((pred, est))
        }
        _ => None,
    };

    let mut entries = Vec::with_capacity(coarse.len() * coarse.len());
    for (a, &from) in coarse.iter().enumerate() {
        for (b, &to) in coarse.iter().enumerate() {
            let (predicted, estimated) = (predicted[a][b], estimated[a][b]);
            let (predicted_interval, estimated_interval) = match &intervals {
                Some((pred, est)) => (pred[a][b], est[a][b]),
                None => (None, None),
            };
            let agrees = match (intervals.is_some(), predicted, estimated) {
                (true, _, _) => match (predicted_interval, estimated_interval) {
                    (Some(p), Some(e)) => intervals_overlap(p, e),
                    _ => false,
                },
                (false, Some(p), Some(e)) => (p - e).abs() <= config.tolerance(),
                _ => false,
            };
            entries.push(CkEntry {
                from,
                to,
                predicted,
                estimated,
                predicted_interval,
                estimated_interval,
                agrees,
            });
        }
    }
    debug!(
        multiplier = m,
        lag,
        n_active = long.n_states(),
        disagreements = entries.iter().filter(|e| !e.agrees).count(),
        "multiplier checked"
    );
    Ok(CkStep {
        multiplier: m,
        lag,
        n_active: long.n_states(),
        entries,
    })
}

/// Percentile intervals of the projected `T^m` over posterior samples.
fn sample_intervals(
    sample: &BayesianSample,
    m: u32,
    labels: &[usize],
    coarse_map: &CoarseMap,
    coarse: &[usize],
    confidence: f64,
) -> Vec<Vec<Option<(f64, f64)>>> {
    let n = coarse.len();
    let mut values = vec![vec![Vec::with_capacity(sample.len()); n]; n];
    for (t, pi) in sample.iter() {
        let p = project(&t.power(m), pi, labels, coarse_map, coarse);
        for a in 0..n {
            for b in 0..n {
                if let Some(v) = p[a][b] {
                    values[a][b].push(v);
                }
            }
        }
    }
    values
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| percentile_interval(v, confidence))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_lag_multiplies() {
        assert_eq!(step_lag(5, 3).unwrap(), 15);
        assert_eq!(step_lag(7, 0).unwrap(), 0);
    }

    #[test]
    fn step_lag_overflow_is_invalid_config() {
        assert!(matches!(
            step_lag(usize::MAX, 2),
            Err(CkError::InvalidConfig { .. })
        ));
        assert!(matches!(
            step_lag(usize::MAX / 2 + 1, u32::MAX),
            Err(CkError::InvalidConfig { .. })
        ));
    }
}
