//! Ck command: Chapman-Kolmogorov test against a coarse-graining map.

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use msm_cktest::ck_test;
use msm_estimate::{CancelToken, estimate_msm};

use crate::cli::CkArgs;
use crate::config::MsmConfig;
use crate::convert;
use crate::input;
use crate::report;

/// Run the Chapman-Kolmogorov test.
pub fn run(args: CkArgs) -> Result<()> {
    let _cmd = info_span!("ck").entered();
    // 1. Load config, trajectories and coarse map
    let mut config = MsmConfig::load(&args.input.config)?;
    if args.input.seed.is_some() {
        config.seed = args.input.seed;
    }
    let trajectories = input::read_trajectories(&args.input.trajectories)?;
    let coarse_map = input::read_coarse_map(&args.coarse_map)?;

    // 2. Base model
    let estimator = convert::build_estimator_config(&config.estimator, args.lag)?;
    let msm = estimate_msm(&trajectories, &estimator).context("estimation failed")?;
    info!(lag = msm.lag(), n_states = msm.n_states(), "base model estimated");

    // 3. Test
    let ck_cfg = convert::build_ck_config(&config, estimator)?;
    let result = ck_test(&msm, &trajectories, &coarse_map, &ck_cfg, &CancelToken::new())
        .context("Chapman-Kolmogorov test failed")?;
    if !result.all_agree() {
        warn!(
            n_disagreements = result.n_disagreements(),
            "model is not Chapman-Kolmogorov consistent at this lag"
        );
    }

    report::write_json(&result, args.output.as_deref())
}
