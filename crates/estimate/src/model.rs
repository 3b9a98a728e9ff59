//! The estimated Markov state model and the end-to-end estimation entry point.

use msm_counts::{ConnectedSet, CountMatrix, DiscreteTrajectory, connect, count_transitions};
use tracing::{debug, info};

use crate::config::{EstimatorConfig, Reversibility};
use crate::error::EstimateError;
use crate::mle::{Convergence, TransitionEstimator};
use crate::simulate::simulate_states_into;
use crate::transition::{StationaryDistribution, TransitionMatrix};

/// An immutable Markov state model at a single lag time.
///
/// Matrix indices are positions in the active set; use
/// [`MarkovStateModel::position`] and [`MarkovStateModel::label`] to map
/// between positions and the original state labels.
#[derive(Debug, Clone)]
pub struct MarkovStateModel {
    lag: usize,
    active_set: ConnectedSet,
    counts: CountMatrix,
    transition: TransitionMatrix,
    stationary: StationaryDistribution,
    reversibility: Reversibility,
    convergence: Convergence,
}

/// Largest allowed `|pi T - pi|` entry when assembling a model from parts.
const STATIONARITY_TOL: f64 = 1e-8;

fn stationarity_residual(transition: &TransitionMatrix, stationary: &StationaryDistribution) -> f64 {
    let n = transition.n_states();
    (0..n)
        .map(|j| {
            let flow: f64 = (0..n).map(|i| stationary.get(i) * transition.prob(i, j)).sum();
            (flow - stationary.get(j)).abs()
        })
        .fold(0.0, f64::max)
}

impl MarkovStateModel {
    /// Assembles a model from previously estimated parts.
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | Active set labels not strictly increasing | [`EstimateError::Count`] |
    /// | Count entry outside the active set | [`EstimateError::Count`] |
    /// | Parts disagree in size | [`EstimateError::InvalidMatrix`] |
    /// | Transition matrix not row-stochastic | [`EstimateError::InvalidMatrix`] |
    /// | Stationary distribution not invariant under T | [`EstimateError::InvalidMatrix`] |
    pub fn from_parts(
        active_set: ConnectedSet,
        counts: CountMatrix,
        transition: TransitionMatrix,
        stationary: StationaryDistribution,
        reversibility: Reversibility,
        convergence: Convergence,
    ) -> Result<Self, EstimateError> {
        active_set.validate()?;
        counts.validate()?;
        let n = active_set.len();
        if counts.n_states() != n || transition.n_states() != n || stationary.len() != n {
            return Err(EstimateError::InvalidMatrix {
                reason: format!(
                    "size mismatch: active set {n}, counts {}, transition {}, stationary {}",
                    counts.n_states(),
                    transition.n_states(),
                    stationary.len()
                ),
            });
        }
        transition.validate()?;
        let residual = stationarity_residual(&transition, &stationary);
        if residual > STATIONARITY_TOL {
            return Err(EstimateError::InvalidMatrix {
                reason: format!("stationary distribution is not invariant: max |pi T - pi| = {residual:e}"),
            });
        }
        Ok(Self {
            lag: counts.lag(),
            active_set,
            counts,
            transition,
            stationary,
            reversibility,
            convergence,
        })
    }

    // --- Accessors ---

    /// Returns the lag time in steps.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Returns the active (connected) set.
    pub fn active_set(&self) -> &ConnectedSet {
        &self.active_set
    }

    /// Returns the count matrix restricted to the active set.
    pub fn counts(&self) -> &CountMatrix {
        &self.counts
    }

    /// Returns the transition matrix.
    pub fn transition(&self) -> &TransitionMatrix {
        &self.transition
    }

    /// Returns the stationary distribution.
    pub fn stationary(&self) -> &StationaryDistribution {
        &self.stationary
    }

    /// Returns the reversibility the model was estimated with.
    pub fn reversibility(&self) -> Reversibility {
        self.reversibility
    }

    /// Returns the estimator's convergence report.
    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    /// Returns the number of active states.
    pub fn n_states(&self) -> usize {
        self.active_set.len()
    }

    /// Returns the matrix position of an original state label.
    pub fn position(&self, label: usize) -> Result<usize, EstimateError> {
        self.active_set
            .position(label)
            .ok_or(EstimateError::UnknownState { label })
    }

    /// Returns the original state label at a matrix position.
    pub fn label(&self, position: usize) -> usize {
        self.active_set.states()[position]
    }

    /// Draws a synthetic trajectory of `n_steps` frames starting at the
    /// original label `start`. The first frame is `start`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::UnknownState`] if `start` is not active.
    pub fn simulate(
        &self,
        n_steps: usize,
        start: usize,
        rng: &mut impl rand::Rng,
    ) -> Result<DiscreteTrajectory, EstimateError> {
        let initial = self.position(start)?;
        if n_steps == 0 {
            return Ok(DiscreteTrajectory::new(Vec::new()));
        }
        let mut positions = vec![initial; n_steps];
        simulate_states_into(
            &self.transition,
            n_steps - 1,
            initial,
            rng,
            &mut positions[1..],
        )?;
        let labels = positions.iter().map(|&p| self.label(p) as i32).collect();
        Ok(DiscreteTrajectory::new(labels))
    }
}

/// Counts, connects and estimates a Markov state model in one call.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`EstimateError::InvalidConfig`] | `config.validate()` fails |
/// | [`EstimateError::Count`] | no usable data, or no connected set of at least 2 states |
/// | [`EstimateError::NumericalInstability`] | reversible iteration broke down |
/// | [`EstimateError::InvalidMatrix`] | non-reversible stationary system is singular |
#[tracing::instrument(skip(trajectories, config), fields(lag = config.lag(), reversible = config.reversibility().is_reversible()))]
pub fn estimate_msm(
    trajectories: &[DiscreteTrajectory],
    config: &EstimatorConfig,
) -> Result<MarkovStateModel, EstimateError> {
    config.validate()?;
    let counts = count_transitions(trajectories, config.count())?;
    let reversible = config.reversibility().is_reversible();
    let (active_set, restricted) = connect(&counts, reversible, config.connectivity())?;
    debug!(
        n_observed = counts.n_states(),
        n_active = active_set.len(),
        mass = active_set.mass(),
        "active set selected"
    );

    let estimate = TransitionEstimator::from_config(config).estimate(&restricted)?;
    info!(
        n_states = active_set.len(),
        iterations = estimate.convergence.iterations(),
        converged = estimate.convergence.is_converged(),
        "model estimated"
    );

    Ok(MarkovStateModel {
        lag: config.lag(),
        active_set,
        counts: restricted,
        transition: estimate.transition,
        stationary: estimate.stationary,
        reversibility: config.reversibility(),
        convergence: estimate.convergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use msm_counts::CountError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn traj(states: &[i32]) -> DiscreteTrajectory {
        DiscreteTrajectory::new(states.to_vec())
    }

    #[test]
    fn labels_map_through_active_set() {
        // State 1 never appears; state 5 only once at the end (no outgoing).
        let t = traj(&[0, 2, 0, 2, 2, 0, 0, 2, 5]);
        let config = EstimatorConfig::new(1).with_reversibility(Reversibility::NonReversible);
        let msm = estimate_msm(&[t], &config).unwrap();
        assert_eq!(msm.active_set().states(), &[0, 2]);
        assert_eq!(msm.position(2).unwrap(), 1);
        assert_eq!(msm.label(1), 2);
        assert!(matches!(
            msm.position(5),
            Err(EstimateError::UnknownState { label: 5 })
        ));
    }

    #[test]
    fn invalid_config_rejected_before_counting() {
        let config = EstimatorConfig::new(1).with_tol(-1.0);
        assert!(matches!(
            estimate_msm(&[traj(&[0, 1, 0])], &config),
            Err(EstimateError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn count_errors_are_wrapped() {
        let config = EstimatorConfig::new(5);
        assert!(matches!(
            estimate_msm(&[traj(&[0, 1, 0])], &config),
            Err(EstimateError::Count(CountError::InsufficientData { .. }))
        ));
    }

    #[test]
    fn simulate_starts_at_label_and_stays_active() {
        let t = traj(&[3, 7, 3, 3, 7, 7, 3, 7, 3]);
        let msm = estimate_msm(&[t], &EstimatorConfig::new(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let sim = msm.simulate(200, 7, &mut rng).unwrap();
        assert_eq!(sim.len(), 200);
        assert_eq!(sim.as_slice()[0], 7);
        assert!(sim.as_slice().iter().all(|&s| s == 3 || s == 7));
        assert!(msm.simulate(10, 4, &mut rng).is_err());
        assert!(msm.simulate(0, 3, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn from_parts_checks_sizes() {
        let t = traj(&[0, 1, 0, 1, 1, 0]);
        let msm = estimate_msm(&[t], &EstimatorConfig::new(1)).unwrap();
        let rebuilt = MarkovStateModel::from_parts(
            msm.active_set().clone(),
            msm.counts().clone(),
            msm.transition().clone(),
            msm.stationary().clone(),
            msm.reversibility(),
            msm.convergence(),
        )
        .unwrap();
        assert_eq!(rebuilt.lag(), 1);

        let wrong = StationaryDistribution::from_weights(vec![1.0, 1.0, 1.0]).unwrap();
        assert!(
            MarkovStateModel::from_parts(
                msm.active_set().clone(),
                msm.counts().clone(),
                msm.transition().clone(),
                wrong,
                msm.reversibility(),
                msm.convergence(),
            )
            .is_err()
        );
    }

    #[test]
    fn from_parts_rejects_non_invariant_stationary() {
        let t = traj(&[0, 1, 0, 1, 1, 0, 0, 1]);
        let msm = estimate_msm(&[t], &EstimatorConfig::new(1)).unwrap();
        let skewed = StationaryDistribution::from_weights(vec![0.9, 0.1]).unwrap();
        assert!(matches!(
            MarkovStateModel::from_parts(
                msm.active_set().clone(),
                msm.counts().clone(),
                msm.transition().clone(),
                skewed,
                msm.reversibility(),
                msm.convergence(),
            ),
            Err(EstimateError::InvalidMatrix { .. })
        ));
    }
}
