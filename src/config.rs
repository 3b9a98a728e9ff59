use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level msm configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MsmConfig {
    /// Global RNG seed for posterior sampling.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Physical time per trajectory step.
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Unit label for `time_step`, carried into reports.
    #[serde(default = "default_time_unit")]
    pub time_unit: String,

    /// Estimator settings.
    #[serde(default)]
    pub estimator: EstimatorToml,

    /// Posterior sampling settings.
    #[serde(default)]
    pub bayes: BayesToml,

    /// Implied-timescale scan settings.
    #[serde(default)]
    pub its: ItsToml,

    /// Chapman-Kolmogorov test settings.
    #[serde(default)]
    pub ck: CkToml,
}

impl Default for MsmConfig {
    fn default() -> Self {
        Self {
            seed: None,
            time_step: default_time_step(),
            time_unit: default_time_unit(),
            estimator: EstimatorToml::default(),
            bayes: BayesToml::default(),
            its: ItsToml::default(),
            ck: CkToml::default(),
        }
    }
}

impl MsmConfig {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&toml_str).context("failed to parse TOML config")
    }
}

fn default_time_step() -> f64 {
    1.0
}
fn default_time_unit() -> String {
    "step".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorToml {
    #[serde(default)]
    pub lag: Option<usize>,
    #[serde(default = "default_true")]
    pub reversible: bool,
    #[serde(default = "default_count_mode")]
    pub count_mode: String,
    #[serde(default = "default_connectivity")]
    pub connectivity: String,
    /// Candidate labels for `connectivity = "given"`.
    #[serde(default)]
    pub states: Option<Vec<usize>>,
    #[serde(default = "default_estimator_tol")]
    pub tol: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default)]
    pub damping: f64,
}

impl Default for EstimatorToml {
    fn default() -> Self {
        Self {
            lag: None,
            reversible: true,
            count_mode: default_count_mode(),
            connectivity: default_connectivity(),
            states: None,
            tol: default_estimator_tol(),
            max_iter: default_max_iter(),
            damping: 0.0,
        }
    }
}

fn default_count_mode() -> String {
    "sliding".to_string()
}
fn default_connectivity() -> String {
    "largest".to_string()
}
fn default_estimator_tol() -> f64 {
    1e-10
}
fn default_max_iter() -> usize {
    100_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BayesToml {
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    #[serde(default)]
    pub prior: f64,
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    #[serde(default = "default_thin")]
    pub thin: usize,
    #[serde(default = "default_chains")]
    pub chains: usize,
    #[serde(default = "default_step_scale")]
    pub step_scale: f64,
}

impl Default for BayesToml {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            prior: 0.0,
            burn_in: default_burn_in(),
            thin: default_thin(),
            chains: default_chains(),
            step_scale: default_step_scale(),
        }
    }
}

fn default_n_samples() -> usize {
    100
}
fn default_burn_in() -> usize {
    500
}
fn default_thin() -> usize {
    5
}
fn default_chains() -> usize {
    1
}
fn default_step_scale() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItsToml {
    #[serde(default = "default_lags")]
    pub lags: Vec<usize>,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Attach posterior bands using the `[bayes]` settings.
    #[serde(default)]
    pub errors: bool,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_spectral_tol")]
    pub spectral_tol: f64,
}

impl Default for ItsToml {
    fn default() -> Self {
        Self {
            lags: default_lags(),
            k: default_k(),
            errors: false,
            confidence: default_confidence(),
            spectral_tol: default_spectral_tol(),
        }
    }
}

fn default_lags() -> Vec<usize> {
    vec![1, 2, 5, 10, 20, 50]
}
fn default_k() -> usize {
    5
}
fn default_confidence() -> f64 {
    0.95
}
fn default_spectral_tol() -> f64 {
    1e-10
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CkToml {
    #[serde(default = "default_multipliers")]
    pub multipliers: Vec<u32>,
    #[serde(default = "default_ck_tolerance")]
    pub tolerance: f64,
    /// Compare posterior intervals instead of point estimates.
    #[serde(default)]
    pub errors: bool,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Default for CkToml {
    fn default() -> Self {
        Self {
            multipliers: default_multipliers(),
            tolerance: default_ck_tolerance(),
            errors: false,
            confidence: default_confidence(),
        }
    }
}

fn default_multipliers() -> Vec<u32> {
    vec![1, 2, 3, 4, 5]
}
fn default_ck_tolerance() -> f64 {
    0.05
}
