//! Connected-set analysis of the count graph.
//!
//! A transition matrix estimate is only well-posed on a set of states that
//! can reach each other. For non-reversible estimation that is a strongly
//! connected component of the directed graph `i -> j iff C[i][j] > 0`; for
//! reversible estimation an edge additionally needs the reverse count, and
//! components are taken on that undirected graph.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::count::CountMatrix;
use crate::error::CountError;

/// Smallest connected set that still admits a non-trivial model.
const MIN_CONNECTED_STATES: usize = 2;

/// A connected subset of states, as sorted original labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedSet {
    states: Vec<usize>,
    mass: u64,
}

impl ConnectedSet {
    /// Returns the sorted state labels.
    pub fn states(&self) -> &[usize] {
        &self.states
    }

    /// Returns the number of states in the set.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the set has no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns the total count mass of transitions inside the set.
    pub fn mass(&self) -> u64 {
        self.mass
    }

    /// Returns the position of `label` within the set, if present.
    pub fn position(&self, label: usize) -> Option<usize> {
        self.states.binary_search(&label).ok()
    }

    /// Returns true if `label` belongs to the set.
    pub fn contains(&self, label: usize) -> bool {
        self.position(label).is_some()
    }

    /// Checks that the labels are strictly increasing.
    ///
    /// Sets built in this crate always pass; deserialized ones may not.
    ///
    /// # Errors
    ///
    /// Returns [`CountError::InvalidSubset`] on an unsorted or repeated label.
    pub fn validate(&self) -> Result<(), CountError> {
        match self.states.windows(2).find(|w| w[0] >= w[1]) {
            Some(w) => Err(CountError::InvalidSubset {
                reason: format!("active set labels not strictly increasing at {} -> {}", w[0], w[1]),
            }),
            None => Ok(()),
        }
    }
}

/// Selects which connected set an estimate is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectivityMode {
    /// The component with the largest internal count mass.
    #[default]
    Largest,
    /// Every state that carries counts; fails unless they form one set.
    All,
    /// The largest component inside a caller-chosen subset of labels.
    Given(Vec<usize>),
}

/// Builds adjacency lists for the count graph, ignoring self-loops.
fn adjacency(counts: &CountMatrix, reversible: bool) -> Vec<Vec<usize>> {
    let n = counts.n_states();
    let mut adj = vec![Vec::new(); n];
    for (i, j, _) in counts.entries() {
        if i == j {
            continue;
        }
        if !reversible || counts.get(j, i) > 0 {
            adj[i].push(j);
        }
    }
    adj
}

/// Strongly connected components (iterative Kosaraju).
///
/// On a symmetric adjacency this yields ordinary connected components.
fn strong_components(adj: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adj.len();

    // Pass 1: finishing order on the forward graph.
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some(top) = stack.last_mut() {
            let v = top.0;
            if let Some(&w) = adj[v].get(top.1) {
                top.1 += 1;
                if !visited[w] {
                    visited[w] = true;
                    stack.push((w, 0));
                }
            } else {
                order.push(v);
                stack.pop();
            }
        }
    }

    // Pass 2: reverse finishing order on the transposed graph.
    let mut transposed = vec![Vec::new(); n];
    for (v, targets) in adj.iter().enumerate() {
        for &w in targets {
            transposed[w].push(v);
        }
    }
    let mut assigned = vec![false; n];
    let mut components = Vec::new();
    for &root in order.iter().rev() {
        if assigned[root] {
            continue;
        }
        assigned[root] = true;
        let mut component = vec![root];
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            for &w in &transposed[v] {
                if !assigned[w] {
                    assigned[w] = true;
                    component.push(w);
                    stack.push(w);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

/// Returns every connected set of states that carries counts.
///
/// States with no counts at all are left out. Sets are sorted by
/// descending internal count mass; ties go to the set with the smallest
/// label.
pub fn connected_sets(counts: &CountMatrix, reversible: bool) -> Vec<ConnectedSet> {
    let col_sums = counts.col_sums();
    let active: Vec<bool> = (0..counts.n_states())
        .map(|i| counts.row_sum(i) > 0 || col_sums[i] > 0)
        .collect();

    let mut sets: Vec<ConnectedSet> = strong_components(&adjacency(counts, reversible))
        .into_iter()
        .filter(|c| c.iter().any(|&s| active[s]))
        .map(|states| {
            let mass = states
                .iter()
                .flat_map(|&i| counts.row(i))
                .filter(|(j, _)| states.binary_search(j).is_ok())
                .map(|(_, c)| c)
                .sum();
            ConnectedSet { states, mass }
        })
        .collect();

    sets.sort_by(|a, b| b.mass.cmp(&a.mass).then(a.states[0].cmp(&b.states[0])));
    sets
}

/// Returns the connected set with the largest internal count mass.
///
/// # Errors
///
/// Returns [`CountError::DisconnectedModel`] if that set has fewer than two
/// states.
pub fn largest_connected_set(
    counts: &CountMatrix,
    reversible: bool,
) -> Result<ConnectedSet, CountError> {
    let largest = connected_sets(counts, reversible).into_iter().next();
    let size = largest.as_ref().map_or(0, ConnectedSet::len);
    match largest {
        Some(set) if size >= MIN_CONNECTED_STATES => Ok(set),
        _ => Err(CountError::DisconnectedModel {
            size,
            min: MIN_CONNECTED_STATES,
        }),
    }
}

/// Restricts a count matrix to a set, re-indexing rows and columns by
/// position within the set.
pub fn restrict(counts: &CountMatrix, set: &ConnectedSet) -> CountMatrix {
    counts.submatrix(set.states())
}

/// Finds the connected set selected by `mode` and restricts the counts to it.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`CountError::InvalidSubset`] | `Given` subset is empty or has out-of-range labels |
/// | [`CountError::DisconnectedModel`] | selected set has fewer than two states, or `All` finds more than one set |
pub fn connect(
    counts: &CountMatrix,
    reversible: bool,
    mode: &ConnectivityMode,
) -> Result<(ConnectedSet, CountMatrix), CountError> {
    let set = match mode {
        ConnectivityMode::Largest => largest_connected_set(counts, reversible)?,
        ConnectivityMode::All => {
            let sets = connected_sets(counts, reversible);
            let n_active: usize = sets.iter().map(ConnectedSet::len).sum();
            match sets.into_iter().next() {
                Some(set) if set.len() == n_active && n_active >= MIN_CONNECTED_STATES => set,
                largest => {
                    return Err(CountError::DisconnectedModel {
                        size: largest.map_or(0, |s| s.len()),
                        min: n_active.max(MIN_CONNECTED_STATES),
                    });
                }
            }
        }
        ConnectivityMode::Given(subset) => {
            let subset = validate_subset(subset, counts.n_states())?;
            let inner = largest_connected_set(&counts.submatrix(&subset), reversible)?;
            ConnectedSet {
                states: inner.states.iter().map(|&k| subset[k]).collect(),
                mass: inner.mass,
            }
        }
    };
    debug!(
        n_states = counts.n_states(),
        n_connected = set.len(),
        mass = set.mass(),
        "connected set selected"
    );
    let restricted = restrict(counts, &set);
    Ok((set, restricted))
}

fn validate_subset(subset: &[usize], n_states: usize) -> Result<Vec<usize>, CountError> {
    if subset.is_empty() {
        return Err(CountError::InvalidSubset {
            reason: "subset is empty".to_string(),
        });
    }
    if let Some(&bad) = subset.iter().find(|&&s| s >= n_states) {
        return Err(CountError::InvalidSubset {
            reason: format!("state {bad} is outside the label space 0..{n_states}"),
        });
    }
    let mut sorted = subset.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(dense: &[&[u64]]) -> CountMatrix {
        let rows: Vec<Vec<u64>> = dense.iter().map(|r| r.to_vec()).collect();
        CountMatrix::from_dense(&rows, 1).unwrap()
    }

    #[test]
    fn validate_requires_strictly_increasing_labels() {
        let sorted = ConnectedSet {
            states: vec![0, 2, 5],
            mass: 3,
        };
        assert!(sorted.validate().is_ok());
        for states in [vec![2, 0], vec![1, 1]] {
            let bad = ConnectedSet { states, mass: 1 };
            assert!(matches!(
                bad.validate(),
                Err(CountError::InvalidSubset { .. })
            ));
        }
    }

    #[test]
    fn strongly_connected_chain() {
        // 0 <-> 1 -> 2 (2 cannot return)
        let c = counts(&[&[5, 3, 0], &[2, 5, 1], &[0, 0, 4]]);
        let sets = connected_sets(&c, false);
        assert_eq!(sets[0].states(), &[0, 1]);
        assert_eq!(sets[0].mass(), 15);
        assert_eq!(sets[1].states(), &[2]);
    }

    #[test]
    fn reversible_requires_both_directions() {
        // 0 -> 1 only, 1 <-> 2
        let c = counts(&[&[1, 3, 0], &[0, 1, 2], &[0, 2, 1]]);
        let set = largest_connected_set(&c, true).unwrap();
        assert_eq!(set.states(), &[1, 2]);
    }

    #[test]
    fn largest_by_mass_not_size() {
        // {0,1,2} cycle with light counts, {3,4} heavy
        let c = counts(&[
            &[0, 1, 0, 0, 0],
            &[0, 0, 1, 0, 0],
            &[1, 0, 0, 0, 0],
            &[0, 0, 0, 50, 50],
            &[0, 0, 0, 50, 50],
        ]);
        let set = largest_connected_set(&c, false).unwrap();
        assert_eq!(set.states(), &[3, 4]);
    }

    #[test]
    fn two_blocks_tie_picks_lowest_label() {
        let c = counts(&[&[1, 1, 0, 0], &[1, 1, 0, 0], &[0, 0, 1, 1], &[0, 0, 1, 1]]);
        let sets = connected_sets(&c, true);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].states(), &[0, 1]);
    }

    #[test]
    fn single_state_is_disconnected() {
        let c = counts(&[&[10, 0], &[0, 0]]);
        assert_eq!(
            largest_connected_set(&c, false),
            Err(CountError::DisconnectedModel { size: 1, min: 2 })
        );
    }

    #[test]
    fn no_counts_is_disconnected() {
        let c = CountMatrix::zeros(3, 1);
        assert_eq!(
            largest_connected_set(&c, false),
            Err(CountError::DisconnectedModel { size: 0, min: 2 })
        );
    }

    #[test]
    fn unvisited_labels_are_skipped() {
        // label 1 never occurs
        let c = counts(&[&[1, 0, 1], &[0, 0, 0], &[1, 0, 1]]);
        let set = largest_connected_set(&c, true).unwrap();
        assert_eq!(set.states(), &[0, 2]);
        assert!(set.contains(2));
        assert!(!set.contains(1));
        assert_eq!(set.position(2), Some(1));
    }

    #[test]
    fn connect_restricts_and_reindexes() {
        let c = counts(&[&[0, 0, 0], &[0, 3, 1], &[0, 2, 4]]);
        let (set, restricted) = connect(&c, false, &ConnectivityMode::Largest).unwrap();
        assert_eq!(set.states(), &[1, 2]);
        assert_eq!(restricted.to_dense(), vec![vec![3.0, 1.0], vec![2.0, 4.0]]);
    }

    #[test]
    fn given_subset_maps_back_to_labels() {
        let c = counts(&[&[1, 1, 0, 0], &[1, 1, 0, 0], &[0, 0, 9, 9], &[0, 0, 9, 9]]);
        let (set, restricted) = connect(&c, false, &ConnectivityMode::Given(vec![1, 0])).unwrap();
        assert_eq!(set.states(), &[0, 1]);
        assert_eq!(restricted.total(), 4);
    }

    #[test]
    fn all_mode_rejects_split_graph() {
        let c = counts(&[&[1, 1, 0, 0], &[1, 1, 0, 0], &[0, 0, 9, 9], &[0, 0, 9, 9]]);
        assert_eq!(
            connect(&c, true, &ConnectivityMode::All).map(|(s, _)| s),
            Err(CountError::DisconnectedModel { size: 2, min: 4 })
        );
    }

    #[test]
    fn all_mode_accepts_single_set() {
        let c = counts(&[&[1, 2, 0], &[2, 1, 3], &[0, 3, 1]]);
        let (set, _) = connect(&c, true, &ConnectivityMode::All).unwrap();
        assert_eq!(set.states(), &[0, 1, 2]);
    }

    #[test]
    fn given_subset_validation() {
        let c = counts(&[&[1, 1], &[1, 1]]);
        assert!(matches!(
            connect(&c, false, &ConnectivityMode::Given(vec![])),
            Err(CountError::InvalidSubset { .. })
        ));
        assert!(matches!(
            connect(&c, false, &ConnectivityMode::Given(vec![0, 5])),
            Err(CountError::InvalidSubset { .. })
        ));
    }

    #[test]
    fn long_chain_does_not_overflow_stack() {
        let n = 20_000;
        let mut c = CountMatrix::zeros(n, 1);
        for i in 0..n {
            c.add(i, (i + 1) % n, 1);
        }
        let set = largest_connected_set(&c, false).unwrap();
        assert_eq!(set.len(), n);
    }
}
