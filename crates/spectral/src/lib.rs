//! Spectral analysis of Markov state models.
//!
//! Eigenvalues of a transition matrix estimated at lag `tau` relate to
//! relaxation processes through the implied timescale
//! `t_k = -tau / ln|lambda_k|`. Slow processes have eigenvalues close to 1.
//!
//! Reversible models use the symmetric eigensolver on
//! `D^{1/2} T D^{-1/2}`; non-reversible models use the general complex
//! eigenvalues.
//!
//! # Quick start
//!
//! ```rust
//! use msm_estimate::TransitionMatrix;
//! use msm_spectral::{SpectralConfig, spectrum};
//!
//! let t = TransitionMatrix::from_rows(&[vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
//! let s = spectrum(&t, None, 1, &SpectralConfig::new(1)).unwrap();
//! assert!((s.timescales()[0] - (-1.0 / 0.7_f64.ln())).abs() < 1e-9);
//! ```

pub mod config;
pub mod eigen;
pub mod error;
pub mod spectrum;

pub use config::SpectralConfig;
pub use eigen::eigenvalues;
pub use error::SpectralError;
pub use spectrum::{RankDeficit, Spectrum, SpectrumEntry, model_spectrum, spectrum};
