use msm_bayes::{BayesConfig, sample_model};
use msm_counts::DiscreteTrajectory;
use msm_estimate::{CancelToken, EstimatorConfig, TransitionMatrix, estimate_msm, simulate_states};
use msm_snapshot::{
    DirStore, FORMAT_VERSION, MemoryStore, ModelSnapshot, SnapshotError, SnapshotStore,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn snapshot(name: &str, seed: u64) -> ModelSnapshot {
    let t = TransitionMatrix::from_rows(&[
        vec![0.8, 0.15, 0.05],
        vec![0.1, 0.8, 0.1],
        vec![0.05, 0.15, 0.8],
    ])
    .unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let states = simulate_states(&t, 5_000, 0, &mut rng).unwrap();
    let traj = DiscreteTrajectory::new(states.into_iter().map(|s| s as i32).collect());
    let config = EstimatorConfig::new(1);
    let msm = estimate_msm(&[traj], &config).unwrap();
    ModelSnapshot::new(name, &msm, &config)
}

fn exercise(store: &mut dyn SnapshotStore) {
    let a = snapshot("alpha", 1);
    let b = snapshot("beta", 2);
    store.save(&b).unwrap();
    store.save(&a).unwrap();
    assert_eq!(store.names().unwrap(), vec!["alpha", "beta"]);

    let loaded = store.load("alpha").unwrap();
    assert_eq!(loaded.name, "alpha");
    assert_eq!(loaded.counts, a.counts);
    assert_eq!(loaded.active_set, a.active_set);

    // Overwrite keeps a single entry.
    let replacement = ModelSnapshot {
        name: "alpha".to_string(),
        ..snapshot("tmp", 3)
    };
    store.save(&replacement).unwrap();
    assert_eq!(store.names().unwrap().len(), 2);
    assert_eq!(store.load("alpha").unwrap().counts, replacement.counts);

    assert!(matches!(
        store.load("gamma"),
        Err(SnapshotError::NotFound { .. })
    ));
    let bad = ModelSnapshot {
        name: "../escape".to_string(),
        ..snapshot("tmp", 4)
    };
    assert!(matches!(
        store.save(&bad),
        Err(SnapshotError::InvalidName { .. })
    ));
}

// ---------------------------------------------------------------------------
// 1. memory_store_behaves_like_a_map
// ---------------------------------------------------------------------------
#[test]
fn memory_store_behaves_like_a_map() {
    let mut store = MemoryStore::new();
    exercise(&mut store);
}

// ---------------------------------------------------------------------------
// 2. dir_store_behaves_like_a_map
// ---------------------------------------------------------------------------
#[test]
fn dir_store_behaves_like_a_map() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = DirStore::open(dir.path().join("models")).unwrap();
    exercise(&mut store);
    assert!(store.root().join("alpha.json").is_file());
}

// ---------------------------------------------------------------------------
// 3. dir_store_ignores_foreign_files
// ---------------------------------------------------------------------------
#[test]
fn dir_store_ignores_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    let mut store = DirStore::open(dir.path()).unwrap();
    store.save(&snapshot("only", 5)).unwrap();
    assert_eq!(store.names().unwrap(), vec!["only"]);
}

// ---------------------------------------------------------------------------
// 4. dir_store_reports_bad_files
// ---------------------------------------------------------------------------
#[test]
fn dir_store_reports_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::open(dir.path()).unwrap();

    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    assert!(matches!(
        store.load("broken"),
        Err(SnapshotError::Malformed { .. })
    ));

    let mut future = serde_json::to_value(snapshot("future", 6)).unwrap();
    future["format_version"] = (FORMAT_VERSION + 1).into();
    std::fs::write(dir.path().join("future.json"), future.to_string()).unwrap();
    assert_eq!(
        store.load("future"),
        Err(SnapshotError::UnsupportedVersion {
            found: FORMAT_VERSION + 1,
            supported: FORMAT_VERSION,
        })
    );
}

// ---------------------------------------------------------------------------
// 5. posterior_samples_survive_the_store
// ---------------------------------------------------------------------------
#[test]
fn posterior_samples_survive_the_store() {
    let base = snapshot("post", 7);
    let msm = base.to_model().unwrap();
    let sample = sample_model(
        &msm,
        &BayesConfig::new(8).with_burn_in(20).with_seed(1),
        &CancelToken::new(),
    )
    .unwrap();
    let with_posterior = base.with_posterior(&sample);

    let dir = tempfile::tempdir().unwrap();
    let mut store = DirStore::open(dir.path()).unwrap();
    store.save(&with_posterior).unwrap();
    let loaded = store.load("post").unwrap();
    let posterior = loaded.posterior_transitions().unwrap();
    assert_eq!(posterior.len(), 8);
    for (a, b) in posterior.iter().zip(sample.transitions()) {
        assert_eq!(a.n_states(), b.n_states());
        for i in 0..a.n_states() {
            for j in 0..a.n_states() {
                assert!((a.prob(i, j) - b.prob(i, j)).abs() < 1e-14);
            }
        }
    }
}
