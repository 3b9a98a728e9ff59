//! Implied timescales from the spectrum of a transition matrix.

use msm_estimate::{MarkovStateModel, StationaryDistribution, TransitionMatrix};
use num_complex::Complex64;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SpectralConfig;
use crate::eigen::eigenvalues;
use crate::error::SpectralError;

/// A non-stationary eigenvalue and its implied timescale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumEntry {
    /// The eigenvalue, complex in general.
    pub eigenvalue: Complex64,
    /// `-lag / ln|lambda|`, in steps.
    pub timescale: f64,
}

impl SpectrumEntry {
    /// Returns `|lambda|`.
    pub fn modulus(&self) -> f64 {
        self.eigenvalue.norm()
    }
}

/// Fewer timescales are available than were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankDeficit {
    /// Number of timescales requested.
    pub requested: usize,
    /// Number of timescales the matrix provides.
    pub available: usize,
}

/// The slowest implied timescales of a transition matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    lag: usize,
    requested: usize,
    available: usize,
    n_periodic: usize,
    entries: Vec<SpectrumEntry>,
}

impl Spectrum {
    /// Lag of the transition matrix, in steps.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Entries ordered by decreasing `|lambda|` (non-increasing timescale).
    pub fn entries(&self) -> &[SpectrumEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no timescale is available.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Eigenvalues on the unit circle other than `+1`. They describe
    /// oscillation, not relaxation, and carry no timescale.
    pub fn n_periodic(&self) -> usize {
        self.n_periodic
    }

    /// Timescales in steps.
    pub fn timescales(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.timescale).collect()
    }

    /// Timescales in physical units, given the time per step.
    pub fn timescales_in(&self, time_step: f64) -> Vec<f64> {
        self.entries.iter().map(|e| e.timescale * time_step).collect()
    }

    /// Returns the shortfall if fewer than the requested timescales exist.
    pub fn rank_deficit(&self) -> Option<RankDeficit> {
        (self.available < self.requested).then_some(RankDeficit {
            requested: self.requested,
            available: self.available,
        })
    }
}

/// Computes up to `config.k()` implied timescales of `transition`.
///
/// Pass the stationary distribution for a reversible matrix to use the
/// symmetric eigensolver; pass `None` otherwise.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`SpectralError::InvalidConfig`] | `config.validate()` fails |
/// | [`SpectralError::SpectrumAnomaly`] | no eigenvalue near `+1`, `|lambda| > 1 + tol`, or `+1` repeated |
/// | others | see [`eigenvalues`] |
pub fn spectrum(
    transition: &TransitionMatrix,
    stationary: Option<&StationaryDistribution>,
    lag: usize,
    config: &SpectralConfig,
) -> Result<Spectrum, SpectralError> {
    config.validate()?;
    let tol = config.tol();
    let values = eigenvalues(transition, stationary)?;

    let one = Complex64::new(1.0, 0.0);
    match values.first() {
        Some(z) if (*z - one).norm() <= tol.max(1e-8) => {}
        Some(z) => {
            return Err(anomaly(0, *z, "no eigenvalue at +1"));
        }
        None => {
            return Err(SpectralError::InvalidConfig {
                reason: "transition matrix has no states".to_string(),
            });
        }
    }

    let mut relaxing = Vec::with_capacity(values.len().saturating_sub(1));
    let mut n_periodic = 0;
    for (index, z) in values.iter().enumerate().skip(1) {
        let modulus = z.norm();
        if modulus > 1.0 + tol {
            return Err(anomaly(index, *z, "eigenvalue outside the unit disk"));
        }
        if (*z - one).norm() <= tol {
            return Err(anomaly(index, *z, "repeated unit eigenvalue"));
        }
        if modulus >= 1.0 - tol {
            n_periodic += 1;
            continue;
        }
        relaxing.push(SpectrumEntry {
            eigenvalue: *z,
            timescale: -(lag as f64) / modulus.ln(),
        });
    }
    if n_periodic > 0 {
        warn!(lag, n_periodic, "periodic modes carry no timescale");
    }

    let available = relaxing.len();
    relaxing.truncate(config.k());
    debug!(lag, requested = config.k(), available, "spectrum computed");
    Ok(Spectrum {
        lag,
        requested: config.k(),
        available,
        n_periodic,
        entries: relaxing,
    })
}

/// Computes the implied timescales of an estimated model, using the
/// symmetric eigensolver when the model is reversible.
pub fn model_spectrum(
    msm: &MarkovStateModel,
    config: &SpectralConfig,
) -> Result<Spectrum, SpectralError> {
    let stationary = msm
        .reversibility()
        .is_reversible()
        .then(|| msm.stationary());
    spectrum(msm.transition(), stationary, msm.lag(), config)
}

fn anomaly(index: usize, z: Complex64, reason: &str) -> SpectralError {
    SpectralError::SpectrumAnomaly {
        index,
        re: z.re,
        im: z.im,
        modulus: z.norm(),
        reason: reason.to_string(),
    }
}
