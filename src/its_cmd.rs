//! Its command: implied timescales over the configured lag times.

use anyhow::{Context, Result};
use tracing::{info, info_span};

use msm_estimate::CancelToken;
use msm_its::implied_timescales;

use crate::cli::ItsArgs;
use crate::config::MsmConfig;
use crate::convert;
use crate::input;
use crate::report::{self, WithUnit};

/// Run the implied-timescale scan.
pub fn run(args: ItsArgs) -> Result<()> {
    let _cmd = info_span!("its").entered();
    // 1. Load config and trajectories
    let mut config = MsmConfig::load(&args.input.config)?;
    if args.input.seed.is_some() {
        config.seed = args.input.seed;
    }
    let trajectories = input::read_trajectories(&args.input.trajectories)?;
    info!(n_trajectories = trajectories.len(), "trajectories loaded");

    // 2. Scan
    let its_cfg = convert::build_its_config(&config)?;
    let result = implied_timescales(&trajectories, &its_cfg, &CancelToken::new())
        .context("implied timescale scan failed")?;

    // 3. Report in physical units
    let result = result.in_units(config.time_step);
    report::write_json(
        &WithUnit {
            time_unit: &config.time_unit,
            body: &result,
        },
        args.output.as_deref(),
    )
}
