//! Eigenvalues of transition matrices.

use msm_estimate::{StationaryDistribution, TransitionMatrix};
use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::SpectralError;

/// Returns the full spectrum of `transition`, stationary eigenvalue first.
///
/// With `stationary` given, the matrix is assumed to be in detailed balance
/// with it and the eigenvalues come from the symmetric matrix
/// `S = D^{1/2} T D^{-1/2}` (`D = diag(pi)`), so they are real. Without it,
/// the general (complex) eigenvalues are computed from a Schur
/// decomposition.
///
/// The eigenvalue closest to `+1` is placed first; the rest are sorted by
/// decreasing modulus, ties broken by decreasing real part.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`SpectralError::LengthMismatch`] | `stationary` has the wrong length |
/// | [`SpectralError::NonPositiveStationary`] | a stationary probability is `<= 0` |
/// | [`SpectralError::NonFiniteEigenvalue`] | the solver returned NaN or infinity |
pub fn eigenvalues(
    transition: &TransitionMatrix,
    stationary: Option<&StationaryDistribution>,
) -> Result<Vec<Complex64>, SpectralError> {
    let raw = match stationary {
        Some(pi) => symmetric_eigenvalues(transition, pi)?,
        None => transition
            .as_matrix()
            .complex_eigenvalues()
            .iter()
            .copied()
            .collect(),
    };
    if let Some(index) = raw.iter().position(|z| !(z.re.is_finite() && z.im.is_finite())) {
        return Err(SpectralError::NonFiniteEigenvalue { index });
    }
    Ok(sort_spectrum(raw))
}

fn symmetric_eigenvalues(
    transition: &TransitionMatrix,
    stationary: &StationaryDistribution,
) -> Result<Vec<Complex64>, SpectralError> {
    let n = transition.n_states();
    if stationary.len() != n {
        return Err(SpectralError::LengthMismatch {
            expected: n,
            got: stationary.len(),
        });
    }
    let pi = stationary.as_slice();
    if let Some((state, &value)) = pi.iter().enumerate().find(|(_, p)| **p <= 0.0) {
        return Err(SpectralError::NonPositiveStationary { state, value });
    }
    let sqrt_pi: Vec<f64> = pi.iter().map(|p| p.sqrt()).collect();
    let s = DMatrix::from_fn(n, n, |i, j| {
        let upper = sqrt_pi[i] * transition.prob(i, j) / sqrt_pi[j];
        let lower = sqrt_pi[j] * transition.prob(j, i) / sqrt_pi[i];
        0.5 * (upper + lower)
    });
    Ok(s.symmetric_eigenvalues()
        .iter()
        .map(|&re| Complex64::new(re, 0.0))
        .collect())
}

fn sort_spectrum(mut values: Vec<Complex64>) -> Vec<Complex64> {
    let one = Complex64::new(1.0, 0.0);
    let unit = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (**a - one).norm().total_cmp(&(**b - one).norm()))
        .map(|(i, _)| i);
    let head = unit.map(|i| values.swap_remove(i));
    values.sort_by(|a, b| b.norm().total_cmp(&a.norm()).then(b.re.total_cmp(&a.re)));
    head.into_iter().chain(values).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tm(rows: &[&[f64]]) -> TransitionMatrix {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        TransitionMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn two_state_eigenvalues() {
        // lambda_2 = 1 - a - b
        let t = tm(&[&[0.9, 0.1], &[0.2, 0.8]]);
        let ev = eigenvalues(&t, None).unwrap();
        assert_relative_eq!(ev[0].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(ev[1].re, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn symmetric_path_matches_general_path() {
        let t = tm(&[&[0.9, 0.1, 0.0], &[0.05, 0.85, 0.1], &[0.0, 0.2, 0.8]]);
        let pi = t.stationary_distribution().unwrap();
        let general = eigenvalues(&t, None).unwrap();
        let symmetric = eigenvalues(&t, Some(&pi)).unwrap();
        for (g, s) in general.iter().zip(&symmetric) {
            assert_relative_eq!(g.re, s.re, epsilon = 1e-10);
            assert!(g.im.abs() < 1e-10);
        }
    }

    #[test]
    fn circulant_chain_has_complex_pair() {
        // Eigenvalues 0.1 + 0.9 w^k for the cube roots of unity w.
        let t = tm(&[&[0.1, 0.9, 0.0], &[0.0, 0.1, 0.9], &[0.9, 0.0, 0.1]]);
        let ev = eigenvalues(&t, None).unwrap();
        assert_relative_eq!(ev[0].re, 1.0, epsilon = 1e-10);
        for z in &ev[1..] {
            assert_relative_eq!(z.norm(), 0.73_f64.sqrt(), epsilon = 1e-10);
            assert_relative_eq!(z.re, -0.35, epsilon = 1e-10);
        }
        assert_relative_eq!(ev[1].im, -ev[2].im, epsilon = 1e-10);
    }

    #[test]
    fn unit_eigenvalue_first_even_with_minus_one() {
        let t = tm(&[&[0.0, 1.0], &[1.0, 0.0]]);
        let pi = t.stationary_distribution().unwrap();
        let ev = eigenvalues(&t, Some(&pi)).unwrap();
        assert_relative_eq!(ev[0].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(ev[1].re, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn stationary_checks() {
        let t = tm(&[&[0.9, 0.1], &[0.2, 0.8]]);
        let short = StationaryDistribution::from_weights(vec![1.0]).unwrap();
        assert!(matches!(
            eigenvalues(&t, Some(&short)),
            Err(SpectralError::LengthMismatch {
                expected: 2,
                got: 1
            })
        ));
        let zero = StationaryDistribution::from_weights(vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            eigenvalues(&t, Some(&zero)),
            Err(SpectralError::NonPositiveStationary { state: 1, .. })
        ));
    }
}
