//! Scan results.

use msm_spectral::RankDeficit;
use serde::Serialize;

/// Posterior summary of one timescale at one lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimescaleBand {
    /// Sample mean.
    pub mean: f64,
    /// Lower percentile bound.
    pub lower: f64,
    /// Upper percentile bound.
    pub upper: f64,
    /// Samples that provided this timescale.
    pub n_samples: usize,
}

impl TimescaleBand {
    fn scaled(self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            lower: self.lower * factor,
            upper: self.upper * factor,
            n_samples: self.n_samples,
        }
    }
}

/// Timescales at a single lag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagTimescales {
    /// Lag in steps.
    pub lag: usize,
    /// Size of the active set at this lag.
    pub n_active: usize,
    /// Whether the estimator converged.
    pub converged: bool,
    /// Estimator iterations (0 for closed form).
    pub iterations: usize,
    /// Point-estimate timescales, non-increasing.
    pub timescales: Vec<f64>,
    /// Set when fewer than `k` timescales exist.
    pub rank_deficit: Option<RankDeficit>,
    /// Periodic eigenvalues skipped at this lag.
    pub n_periodic: usize,
    /// Per-timescale posterior bands; `None` without Bayesian errors. An
    /// inner `None` means no sample provided that timescale.
    pub bands: Option<Vec<Option<TimescaleBand>>>,
}

/// Implied timescales across a lag sweep, in lag order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItsResult {
    /// Timescales requested per lag.
    pub k: usize,
    /// Confidence level of the bands.
    pub confidence: f64,
    /// Physical time per step the timescales are expressed in.
    pub time_step: f64,
    /// Per-lag results.
    pub lags: Vec<LagTimescales>,
}

impl ItsResult {
    /// Returns the entry for `lag`, if it was scanned.
    pub fn at_lag(&self, lag: usize) -> Option<&LagTimescales> {
        self.lags.iter().find(|l| l.lag == lag)
    }

    /// Returns a copy with timescales and bands expressed in physical units.
    pub fn in_units(&self, time_step: f64) -> Self {
        let factor = time_step / self.time_step;
        let lags = self
            .lags
            .iter()
            .map(|l| LagTimescales {
                timescales: l.timescales.iter().map(|t| t * factor).collect(),
                bands: l.bands.as_ref().map(|bands| {
                    bands
                        .iter()
                        .map(|b| b.map(|band| band.scaled(factor)))
                        .collect()
                }),
                ..l.clone()
            })
            .collect();
        Self {
            k: self.k,
            confidence: self.confidence,
            time_step,
            lags,
        }
    }
}
