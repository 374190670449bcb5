// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::{MvvError, ScoreMatrix};

/// Agglomeration rule for inter-cluster distances.
///
/// Pinned to `Average` by default: unweighted average linkage with the
/// Euclidean metric is the documented, reproducible choice for this
/// pipeline. `Single` (nearest-neighbor) is kept selectable because it is
/// what a plain SciPy `linkage` call would have used.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkageMethod {
    #[default]
    Average,
    Single,
}

/// One agglomeration step: the two merged clusters and the merge height.
#[derive(Clone, Debug, PartialEq)]
pub struct Merge {
    pub distance: f64,
    /// Leaf indices of the merged cluster, ascending.
    pub members: Vec<usize>,
    /// Leaf indices contributed by the first child, ascending.
    pub left_members: Vec<usize>,
}

/// Binary merge structure over score-matrix rows with per-merge heights.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkageTree {
    merges: Vec<Merge>,
    leaves: usize,
}

impl LinkageTree {
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn leaves(&self) -> usize {
        self.leaves
    }

    /// Heights of the second-to-last and last merges, `(prev, last)`.
    pub fn last_two_distances(&self) -> Option<(f64, f64)> {
        let count = self.merges.len();
        if count < 2 {
            return None;
        }
        Some((
            self.merges[count - 2].distance,
            self.merges[count - 1].distance,
        ))
    }

    /// Cuts the tree into exactly two clusters by undoing the root merge.
    ///
    /// Returns per-leaf labels over {1, 2}: the root's first child gets 1.
    pub fn cut_two(&self) -> Option<Vec<u8>> {
        let root = self.merges.last()?;
        let mut labels = vec![2u8; self.leaves];
        for &leaf in &root.left_members {
            labels[leaf] = 1;
        }
        Some(labels)
    }
}

fn euclidean_row_distance(matrix: &ScoreMatrix, a: usize, b: usize) -> f64 {
    matrix
        .row(a)
        .iter()
        .zip(matrix.row(b))
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}

struct ActiveCluster {
    members: Vec<usize>,
}

/// Builds an agglomerative hierarchical clustering over the feed rows of a
/// score matrix using Euclidean inter-row distances.
pub fn linkage(matrix: &ScoreMatrix, method: LinkageMethod) -> Result<LinkageTree, MvvError> {
    let n = matrix.rows();

    // Pairwise leaf distances, symmetric.
    let mut distances = vec![0.0; n * n];
    for a in 0..n {
        for b in (a + 1)..n {
            let distance = euclidean_row_distance(matrix, a, b);
            if !distance.is_finite() {
                return Err(MvvError::numerical_issue(format!(
                    "non-finite distance between feed rows {a} and {b}"
                )));
            }
            distances[a * n + b] = distance;
            distances[b * n + a] = distance;
        }
    }

    let mut clusters: Vec<Option<ActiveCluster>> = (0..n)
        .map(|leaf| {
            Some(ActiveCluster {
                members: vec![leaf],
            })
        })
        .collect();
    let mut merges = Vec::with_capacity(n - 1);

    for _round in 0..(n - 1) {
        // Closest active pair; ties break on lowest indices for determinism.
        let mut best: Option<(usize, usize, f64)> = None;
        for a in 0..n {
            if clusters[a].is_none() {
                continue;
            }
            for b in (a + 1)..n {
                if clusters[b].is_none() {
                    continue;
                }
                let distance = distances[a * n + b];
                let closer = match best {
                    None => true,
                    Some((_, _, best_distance)) => distance < best_distance,
                };
                if closer {
                    best = Some((a, b, distance));
                }
            }
        }
        let Some((a, b, merge_distance)) = best else {
            break;
        };

        let absorbed = clusters[b]
            .take()
            .ok_or_else(|| MvvError::numerical_issue("linkage bookkeeping lost a cluster"))?;
        let keeper = clusters[a]
            .as_mut()
            .ok_or_else(|| MvvError::numerical_issue("linkage bookkeeping lost a cluster"))?;
        let left_members = keeper.members.clone();
        let size_a = keeper.members.len() as f64;
        let size_b = absorbed.members.len() as f64;
        keeper.members.extend(absorbed.members);
        keeper.members.sort_unstable();
        let members = keeper.members.clone();

        // Lance-Williams update of the surviving slot `a` against the rest.
        for k in 0..n {
            if k == a || k == b || clusters[k].is_none() {
                continue;
            }
            let d_ka = distances[k * n + a];
            let d_kb = distances[k * n + b];
            let updated = match method {
                LinkageMethod::Average => (size_a * d_ka + size_b * d_kb) / (size_a + size_b),
                LinkageMethod::Single => d_ka.min(d_kb),
            };
            distances[k * n + a] = updated;
            distances[a * n + k] = updated;
        }

        merges.push(Merge {
            distance: merge_distance,
            members,
            left_members,
        });
    }

    Ok(LinkageTree { merges, leaves: n })
}
