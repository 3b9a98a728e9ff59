//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};

use crate::config::*;

use msm_bayes::BayesConfig;
use msm_cktest::CkConfig;
use msm_counts::{ConnectivityMode, CountMode};
use msm_estimate::{EstimatorConfig, Reversibility};
use msm_its::{ErrorMode, ItsConfig};

/// Parses a count mode name into the corresponding enum variant.
pub fn parse_count_mode(s: &str) -> Result<CountMode> {
    match s.to_lowercase().as_str() {
        "sliding" => Ok(CountMode::Sliding),
        "sample" => Ok(CountMode::Sample),
        other => bail!("unknown count mode: {other:?}"),
    }
}

/// Parses a connectivity mode name. `given` requires the candidate labels.
pub fn parse_connectivity(s: &str, states: Option<&[usize]>) -> Result<ConnectivityMode> {
    match (s.to_lowercase().as_str(), states) {
        ("largest", None) => Ok(ConnectivityMode::Largest),
        ("all", None) => Ok(ConnectivityMode::All),
        ("given", Some(states)) => Ok(ConnectivityMode::Given(states.to_vec())),
        ("given", None) => bail!("connectivity \"given\" requires [estimator].states"),
        ("largest" | "all", Some(_)) => {
            bail!("[estimator].states is only used with connectivity \"given\"")
        }
        (other, _) => bail!("unknown connectivity mode: {other:?}"),
    }
}

/// Builds an [`EstimatorConfig`]. A CLI `--lag` overrides `[estimator].lag`.
pub fn build_estimator_config(
    estimator: &EstimatorToml,
    lag_override: Option<usize>,
) -> Result<EstimatorConfig> {
    let lag = lag_override
        .or(estimator.lag)
        .context("no lag given: pass --lag or set [estimator].lag")?;
    let reversibility = if estimator.reversible {
        Reversibility::Reversible
    } else {
        Reversibility::NonReversible
    };
    let cfg = EstimatorConfig::new(lag)
        .with_reversibility(reversibility)
        .with_count_mode(parse_count_mode(&estimator.count_mode)?)
        .with_connectivity(parse_connectivity(
            &estimator.connectivity,
            estimator.states.as_deref(),
        )?)
        .with_tol(estimator.tol)
        .with_max_iter(estimator.max_iter)
        .with_damping(estimator.damping);
    cfg.validate().context("invalid [estimator] settings")?;
    Ok(cfg)
}

/// Builds a [`BayesConfig`]. An optional global seed is forwarded to the sampler.
pub fn build_bayes_config(bayes: &BayesToml, seed: Option<u64>) -> Result<BayesConfig> {
    let mut cfg = BayesConfig::new(bayes.n_samples)
        .with_prior(bayes.prior)
        .with_burn_in(bayes.burn_in)
        .with_thin(bayes.thin)
        .with_chains(bayes.chains)
        .with_step_scale(bayes.step_scale);
    if let Some(s) = seed {
        cfg = cfg.with_seed(s);
    }
    cfg.validate().context("invalid [bayes] settings")?;
    Ok(cfg)
}

/// Builds an [`ItsConfig`]. The lag inside `estimator` is replaced per scanned lag.
pub fn build_its_config(config: &MsmConfig) -> Result<ItsConfig> {
    let its = &config.its;
    let first_lag = its.lags.first().copied();
    let estimator = build_estimator_config(&config.estimator, first_lag)?;
    let errors = if its.errors {
        ErrorMode::Bayes(build_bayes_config(&config.bayes, config.seed)?)
    } else {
        ErrorMode::None
    };
    let cfg = ItsConfig::new(its.lags.clone(), its.k, estimator)
        .with_errors(errors)
        .with_confidence(its.confidence)
        .with_spectral_tol(its.spectral_tol);
    cfg.validate().context("invalid [its] settings")?;
    Ok(cfg)
}

/// Builds a [`CkConfig`] around an already-built estimator configuration.
pub fn build_ck_config(config: &MsmConfig, estimator: EstimatorConfig) -> Result<CkConfig> {
    let ck = &config.ck;
    let mut cfg = CkConfig::new(ck.multipliers.clone(), estimator)
        .with_tolerance(ck.tolerance)
        .with_confidence(ck.confidence);
    if ck.errors {
        cfg = cfg.with_bayes(build_bayes_config(&config.bayes, config.seed)?);
    }
    cfg.validate().context("invalid [ck] settings")?;
    Ok(cfg)
}
