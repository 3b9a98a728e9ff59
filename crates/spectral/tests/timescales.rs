use approx::assert_relative_eq;
use msm_counts::DiscreteTrajectory;
use msm_estimate::{EstimatorConfig, Reversibility, estimate_msm};
use msm_spectral::{RankDeficit, SpectralConfig, model_spectrum};

fn alternating(n: usize) -> DiscreteTrajectory {
    DiscreteTrajectory::new((0..n).map(|t| (t % 2) as i32).collect())
}

// ---------------------------------------------------------------------------
// 1. alternating_chain_has_no_timescales
// ---------------------------------------------------------------------------
#[test]
fn alternating_chain_has_no_timescales() {
    for rev in [Reversibility::Reversible, Reversibility::NonReversible] {
        let config = EstimatorConfig::new(1).with_reversibility(rev);
        let msm = estimate_msm(&[alternating(10_000)], &config).unwrap();
        let s = model_spectrum(&msm, &SpectralConfig::new(1)).unwrap();
        assert!(s.is_empty(), "{rev:?}: {:?}", s.entries());
        assert_eq!(s.n_periodic(), 1);
    }
}

// ---------------------------------------------------------------------------
// 2. two_state_k3_reports_rank_deficit
// ---------------------------------------------------------------------------
#[test]
fn two_state_k3_reports_rank_deficit() {
    let traj = DiscreteTrajectory::new(vec![0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0]);
    let msm = estimate_msm(&[traj], &EstimatorConfig::new(1)).unwrap();
    let s = model_spectrum(&msm, &SpectralConfig::new(3)).unwrap();
    assert_eq!(s.len(), 1);
    assert_eq!(
        s.rank_deficit(),
        Some(RankDeficit {
            requested: 3,
            available: 1
        })
    );
    // lambda_2 = trace - 1 for a 2-state chain.
    let t = msm.transition();
    let lambda = t.prob(0, 0) + t.prob(1, 1) - 1.0;
    assert_relative_eq!(s.entries()[0].eigenvalue.re, lambda, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// 3. reversible_and_general_paths_agree
// ---------------------------------------------------------------------------
#[test]
fn reversible_and_general_paths_agree() {
    let traj = DiscreteTrajectory::new(vec![
        0, 0, 1, 1, 2, 2, 1, 0, 0, 1, 2, 2, 2, 1, 1, 0, 0, 0, 1, 2, 1, 0,
    ]);
    let msm = estimate_msm(&[traj], &EstimatorConfig::new(1)).unwrap();
    let config = SpectralConfig::new(2);
    let sym = model_spectrum(&msm, &config).unwrap();
    let general = msm_spectral::spectrum(msm.transition(), None, 1, &config).unwrap();
    assert_eq!(sym.len(), general.len());
    for (a, b) in sym.timescales().iter().zip(general.timescales()) {
        assert_relative_eq!(*a, b, max_relative = 1e-8);
    }
}
