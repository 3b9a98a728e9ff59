//! Estimate command: one model at one lag, optionally saved as a snapshot.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, info_span, warn};

use msm_bayes::sample_model;
use msm_estimate::{CancelToken, MarkovStateModel, estimate_msm, log_likelihood};
use msm_snapshot::{DirStore, ModelSnapshot, SnapshotStore};
use msm_spectral::{SpectralConfig, model_spectrum};

use crate::cli::EstimateArgs;
use crate::config::MsmConfig;
use crate::convert;
use crate::input;
use crate::report::{self, WithUnit};

#[derive(Serialize)]
struct EstimateReport {
    lag: usize,
    time_step: f64,
    reversible: bool,
    converged: bool,
    iterations: usize,
    active_set: Vec<usize>,
    log_likelihood: f64,
    transition: Vec<Vec<f64>>,
    stationary: Vec<f64>,
    timescales: Vec<f64>,
    n_periodic: usize,
}

fn build_report(msm: &MarkovStateModel, config: &MsmConfig) -> Result<EstimateReport> {
    let spectral = SpectralConfig::new(config.its.k).with_tol(config.its.spectral_tol);
    let spectrum = model_spectrum(msm, &spectral).context("spectral analysis failed")?;
    if let Some(deficit) = spectrum.rank_deficit() {
        warn!(
            requested = deficit.requested,
            available = deficit.available,
            "fewer timescales than requested"
        );
    }
    Ok(EstimateReport {
        lag: msm.lag(),
        time_step: config.time_step,
        reversible: msm.reversibility().is_reversible(),
        converged: msm.convergence().is_converged(),
        iterations: msm.convergence().iterations(),
        active_set: msm.active_set().states().to_vec(),
        log_likelihood: log_likelihood(msm.counts(), msm.transition()),
        transition: msm.transition().to_rows(),
        stationary: msm.stationary().as_slice().to_vec(),
        timescales: spectrum.timescales_in(config.time_step),
        n_periodic: spectrum.n_periodic(),
    })
}

/// Run a single estimation.
pub fn run(args: EstimateArgs) -> Result<()> {
    let _cmd = info_span!("estimate").entered();
    // 1. Load config and trajectories
    let mut config = MsmConfig::load(&args.input.config)?;
    if args.input.seed.is_some() {
        config.seed = args.input.seed;
    }
    let trajectories = input::read_trajectories(&args.input.trajectories)?;
    let estimator = convert::build_estimator_config(&config.estimator, args.lag)?;

    // 2. Estimate
    let msm = estimate_msm(&trajectories, &estimator).context("estimation failed")?;
    info!(
        lag = msm.lag(),
        n_states = msm.n_states(),
        "model estimated"
    );

    // 3. Optional snapshot
    if let (Some(name), Some(dir)) = (&args.save, &args.store) {
        let mut snapshot = ModelSnapshot::new(name.as_str(), &msm, &estimator);
        if args.posterior {
            let bayes = convert::build_bayes_config(&config.bayes, config.seed)?;
            let sample = sample_model(&msm, &bayes, &CancelToken::new())
                .context("posterior sampling failed")?;
            snapshot = snapshot.with_posterior(&sample);
        }
        let mut store = DirStore::open(dir)
            .with_context(|| format!("failed to open snapshot store: {}", dir.display()))?;
        store
            .save(&snapshot)
            .with_context(|| format!("failed to save snapshot {name:?}"))?;
    }

    // 4. Report
    let report = build_report(&msm, &config)?;
    report::write_json(
        &WithUnit {
            time_unit: &config.time_unit,
            body: &report,
        },
        args.output.as_deref(),
    )
}
