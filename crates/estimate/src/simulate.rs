//! Markov chain trajectory simulation.

use crate::error::EstimateError;
use crate::transition::TransitionMatrix;

/// Simulates `n_steps` successive states of a Markov chain.
///
/// # Arguments
///
/// * `transition` - Transition matrix to draw from.
/// * `n_steps` - Number of states to draw.
/// * `initial` - Position of the state before the first drawn step.
/// * `rng` - Random number generator.
///
/// # Errors
///
/// Returns [`EstimateError::InvalidConfig`] if `initial` is not a position
/// of `transition`.
pub fn simulate_states(
    transition: &TransitionMatrix,
    n_steps: usize,
    initial: usize,
    rng: &mut impl rand::Rng,
) -> Result<Vec<usize>, EstimateError> {
    let mut out = vec![0; n_steps];
    simulate_states_into(transition, n_steps, initial, rng, &mut out)?;
    Ok(out)
}

/// Simulates states into a pre-allocated buffer.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`EstimateError::BufferLengthMismatch`] | `out.len() != n_steps` |
/// | [`EstimateError::InvalidConfig`] | `initial` is out of range |
pub fn simulate_states_into(
    transition: &TransitionMatrix,
    n_steps: usize,
    initial: usize,
    rng: &mut impl rand::Rng,
    out: &mut [usize],
) -> Result<(), EstimateError> {
    if out.len() != n_steps {
        return Err(EstimateError::BufferLengthMismatch {
            expected: n_steps,
            got: out.len(),
        });
    }
    if initial >= transition.n_states() {
        return Err(EstimateError::InvalidConfig {
            reason: format!(
                "initial position {initial} out of range for {} states",
                transition.n_states()
            ),
        });
    }
    let mut prev = initial;
    for slot in out.iter_mut() {
        let next = transition.sample(prev, rng);
        *slot = next;
        prev = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tm(rows: &[&[f64]]) -> TransitionMatrix {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        TransitionMatrix::from_rows(&rows).unwrap()
    }

    fn mixed() -> TransitionMatrix {
        tm(&[&[0.5, 0.3, 0.2], &[0.1, 0.7, 0.2], &[0.2, 0.3, 0.5]])
    }

    // 1. length_correctness
    #[test]
    fn length_correctness() {
        let mut rng = StdRng::seed_from_u64(42);
        let result = simulate_states(&mixed(), 100, 0, &mut rng).unwrap();
        assert_eq!(result.len(), 100);
        assert!(result.iter().all(|&s| s < 3));
    }

    // 2. zero_steps
    #[test]
    fn zero_steps() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(simulate_states(&mixed(), 0, 0, &mut rng).unwrap().is_empty());
    }

    // 3. deterministic_with_seed
    #[test]
    fn deterministic_with_seed() {
        let mut rng1 = StdRng::seed_from_u64(123);
        let a = simulate_states(&mixed(), 50, 1, &mut rng1).unwrap();
        let mut rng2 = StdRng::seed_from_u64(123);
        let b = simulate_states(&mixed(), 50, 1, &mut rng2).unwrap();
        assert_eq!(a, b);
    }

    // 4. identity_preserves_state
    #[test]
    fn identity_preserves_state() {
        let t = tm(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let mut rng = StdRng::seed_from_u64(42);
        let result = simulate_states(&t, 50, 1, &mut rng).unwrap();
        assert!(result.iter().all(|&s| s == 1));
    }

    // 5. into_matches_allocating
    #[test]
    fn into_matches_allocating() {
        let mut rng1 = StdRng::seed_from_u64(999);
        let alloc = simulate_states(&mixed(), 30, 2, &mut rng1).unwrap();
        let mut rng2 = StdRng::seed_from_u64(999);
        let mut buf = vec![0; 30];
        simulate_states_into(&mixed(), 30, 2, &mut rng2, &mut buf).unwrap();
        assert_eq!(alloc, buf);
    }

    // 6. buffer_mismatch_error
    #[test]
    fn buffer_mismatch_error() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut buf = vec![0; 5];
        let result = simulate_states_into(&mixed(), 10, 0, &mut rng, &mut buf);
        assert!(matches!(
            result,
            Err(EstimateError::BufferLengthMismatch {
                expected: 10,
                got: 5
            })
        ));
    }

    // 7. initial_out_of_range
    #[test]
    fn initial_out_of_range() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            simulate_states(&mixed(), 10, 3, &mut rng),
            Err(EstimateError::InvalidConfig { .. })
        ));
    }

    // 8. distribution_test
    #[test]
    fn distribution_test() {
        let t = tm(&[&[0.2, 0.5, 0.3], &[0.3, 0.2, 0.5], &[0.5, 0.3, 0.2]]);
        let n = 10_000;
        let mut rng = StdRng::seed_from_u64(42);
        let result = simulate_states(&t, n, 0, &mut rng).unwrap();

        let mut counts = [0usize; 3];
        for &s in &result {
            counts[s] += 1;
        }
        // Doubly stochastic: uniform stationary distribution.
        for (k, &c) in counts.iter().enumerate() {
            let f = c as f64 / n as f64;
            assert!((f - 1.0 / 3.0).abs() < 0.05, "state {k} frequency: {f}");
        }
    }
}
