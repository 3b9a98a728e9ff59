//! The lag sweep.

use msm_bayes::{BayesConfig, BayesError, sample_model};
use msm_counts::DiscreteTrajectory;
use msm_estimate::{CancelToken, MarkovStateModel, estimate_msm};
use msm_spectral::{SpectralConfig, model_spectrum, spectrum};
use msm_stats::{mean, percentile_interval};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::{ErrorMode, ItsConfig};
use crate::error::ItsError;
use crate::result::{ItsResult, LagTimescales, TimescaleBand};

/// Estimates a model at every lag of the scan and reports its slowest
/// implied timescales.
///
/// Lags are processed in parallel; results come back in lag order. The first
/// failing lag aborts the scan.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`ItsError::InvalidConfig`] | `config.validate()` fails |
/// | [`ItsError::Estimate`] | a lag has too little data or no connected set |
/// | [`ItsError::Spectral`] | a point estimate has an anomalous spectrum |
/// | [`ItsError::Bayes`] | posterior sampling failed |
/// | [`ItsError::Cancelled`] | `cancel` was triggered |
#[tracing::instrument(skip(trajectories, config, cancel), fields(n_traj = trajectories.len(), n_lags = config.lags().len()))]
pub fn implied_timescales(
    trajectories: &[DiscreteTrajectory],
    config: &ItsConfig,
    cancel: &CancelToken,
) -> Result<ItsResult, ItsError> {
    config.validate()?;
    let lags = config
        .lags()
        .par_iter()
        .map(|&lag| scan_lag(trajectories, lag, config, cancel))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ItsResult {
        k: config.k(),
        confidence: config.confidence(),
        time_step: 1.0,
        lags,
    })
}

fn scan_lag(
    trajectories: &[DiscreteTrajectory],
    lag: usize,
    config: &ItsConfig,
    cancel: &CancelToken,
) -> Result<LagTimescales, ItsError> {
    if cancel.is_cancelled() {
        return Err(ItsError::Cancelled);
    }
    let msm = estimate_msm(trajectories, &config.estimator().at_lag(lag))?;
    let spectral = SpectralConfig::new(config.k()).with_tol(config.spectral_tol());
    let point = model_spectrum(&msm, &spectral)?;
    debug!(
        lag,
        n_active = msm.n_states(),
        n_timescales = point.len(),
        "lag estimated"
    );

    let bands = match config.errors() {
        ErrorMode::None => None,
        ErrorMode::Bayes(bayes) => Some(posterior_bands(
            &msm,
            bayes,
            &spectral,
            config.confidence(),
            cancel,
        )?),
    };

    Ok(LagTimescales {
        lag,
        n_active: msm.n_states(),
        converged: msm.convergence().is_converged(),
        iterations: msm.convergence().iterations(),
        timescales: point.timescales(),
        rank_deficit: point.rank_deficit(),
        n_periodic: point.n_periodic(),
        bands,
    })
}

fn posterior_bands(
    msm: &MarkovStateModel,
    bayes: &BayesConfig,
    spectral: &SpectralConfig,
    confidence: f64,
    cancel: &CancelToken,
) -> Result<Vec<Option<TimescaleBand>>, ItsError> {
    let sample = sample_model(msm, bayes, cancel).map_err(|e| match e {
        BayesError::Cancelled => ItsError::Cancelled,
        other => ItsError::Bayes(other),
    })?;

    let reversible = msm.reversibility().is_reversible();
    let mut per_index: Vec<Vec<f64>> = vec![Vec::new(); spectral.k()];
    let mut skipped = 0usize;
    for (t, pi) in sample.iter() {
        match spectrum(t, reversible.then_some(pi), msm.lag(), spectral) {
            Ok(s) => {
                for (values, ts) in per_index.iter_mut().zip(s.timescales()) {
                    values.push(ts);
                }
            }
            Err(e) => {
                skipped += 1;
                debug!(lag = msm.lag(), error = %e, "sample spectrum skipped");
            }
        }
    }
    if skipped > 0 {
        warn!(
            lag = msm.lag(),
            skipped,
            total = sample.len(),
            "samples without a valid spectrum"
        );
    }

    Ok(per_index
        .iter()
        .map(|values| {
            let (lower, upper) = percentile_interval(values, confidence)?;
            let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            Some(TimescaleBand {
                mean: mean(&finite),
                lower,
                upper,
                n_samples: finite.len(),
            })
        })
        .collect())
}
