//! Coarse-graining of fine states and projection of transition matrices.

use std::collections::BTreeMap;

use msm_estimate::{MarkovStateModel, StationaryDistribution, TransitionMatrix};

use crate::error::CkError;

/// Assignment of fine state labels to coarse (metastable) set labels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoarseMap {
    map: BTreeMap<usize, usize>,
}

impl CoarseMap {
    /// Builds a map from `(fine, coarse)` pairs. A repeated fine label keeps
    /// its last assignment.
    pub fn new(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Returns the coarse label of a fine state.
    pub fn coarse_of(&self, fine: usize) -> Option<usize> {
        self.map.get(&fine).copied()
    }

    /// Number of mapped fine states.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Checks that every active state of `msm` has a coarse label and
    /// returns the coarse labels in use, sorted.
    pub fn coarse_states(&self, msm: &MarkovStateModel) -> Result<Vec<usize>, CkError> {
        let mut used: Vec<usize> = msm
            .active_set()
            .states()
            .iter()
            .map(|&label| {
                self.coarse_of(label)
                    .ok_or(CkError::IncompleteCoarseMap { label })
            })
            .collect::<Result<_, _>>()?;
        used.sort_unstable();
        used.dedup();
        Ok(used)
    }
}

/// Coarse transition probabilities `P(A -> B)` between the given coarse
/// sets, weighting each fine start state by its stationary probability:
///
/// ```text
/// P(A -> B) = sum_{i in A} pi_i sum_{j in B} T_ij / sum_{i in A} pi_i
/// ```
///
/// `labels[p]` is the fine label at matrix position `p`. Entries involving a
/// coarse set with no members, or starting from one with zero stationary
/// weight, are `None`.
pub fn project(
    transition: &TransitionMatrix,
    stationary: &StationaryDistribution,
    labels: &[usize],
    map: &CoarseMap,
    coarse: &[usize],
) -> Vec<Vec<Option<f64>>> {
    let index: BTreeMap<usize, usize> = coarse.iter().enumerate().map(|(k, &c)| (c, k)).collect();
    let member_of: Vec<Option<usize>> = labels
        .iter()
        .map(|&l| map.coarse_of(l).and_then(|c| index.get(&c).copied()))
        .collect();

    let n_coarse = coarse.len();
    let mut weight = vec![0.0; n_coarse];
    let mut flow = vec![vec![0.0; n_coarse]; n_coarse];
    let mut present = vec![false; n_coarse];
    for (i, from) in member_of.iter().enumerate() {
        let Some(a) = *from else { continue };
        present[a] = true;
        let pi = stationary.get(i);
        weight[a] += pi;
        for (j, to) in member_of.iter().enumerate() {
            if let Some(b) = *to {
                flow[a][b] += pi * transition.prob(i, j);
            }
        }
    }

    (0..n_coarse)
        .map(|a| {
            (0..n_coarse)
                .map(|b| (weight[a] > 0.0 && present[b]).then(|| flow[a][b] / weight[a]))
                .collect()
        })
        .collect()
}

/// Position-to-label table of a model.
pub(crate) fn labels_of(msm: &MarkovStateModel) -> Vec<usize> {
    msm.active_set().states().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_map_reproduces_matrix() {
        let t = TransitionMatrix::from_rows(&[vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        let pi = t.stationary_distribution().unwrap();
        let map = CoarseMap::new([(0, 0), (1, 1)]);
        let p = project(&t, &pi, &[0, 1], &map, &[0, 1]);
        assert_relative_eq!(p[0][1].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(p[1][0].unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn lumped_rows_are_pi_weighted() {
        // States 0 and 1 lumped into A, state 2 is B.
        let t = TransitionMatrix::from_rows(&[
            vec![0.8, 0.1, 0.1],
            vec![0.1, 0.6, 0.3],
            vec![0.1, 0.1, 0.8],
        ])
        .unwrap();
        let pi = StationaryDistribution::from_weights(vec![0.5, 0.25, 0.25]).unwrap();
        let map = CoarseMap::new([(0, 7), (1, 7), (2, 9)]);
        let p = project(&t, &pi, &[0, 1, 2], &map, &[7, 9]);
        // (0.5 * 0.1 + 0.25 * 0.3) / 0.75
        assert_relative_eq!(p[0][1].unwrap(), 0.125 / 0.75, epsilon = 1e-12);
        assert_relative_eq!(p[0][0].unwrap() + p[0][1].unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[1][1].unwrap(), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn absent_coarse_set_yields_none() {
        let t = TransitionMatrix::from_rows(&[vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        let pi = t.stationary_distribution().unwrap();
        let map = CoarseMap::new([(0, 0), (1, 0), (5, 1)]);
        let p = project(&t, &pi, &[0, 1], &map, &[0, 1]);
        assert_relative_eq!(p[0][0].unwrap(), 1.0, epsilon = 1e-12);
        assert!(p[0][1].is_none());
        assert!(p[1][0].is_none());
    }
}
