// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::{MvvError, ScoreMatrix};

use crate::linkage::{linkage, LinkageMethod};

/// Outcome of one consensus pass over a score matrix.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Number of feeds flagged as outliers, in `0..=NUM_FEEDS`.
    pub fake_count: usize,
    /// Per-feed flags when a split was made, `true` marking an outlier.
    /// `None` when the ratio rule kept all feeds in one cluster.
    pub partition: Option<Vec<bool>>,
}

impl Detection {
    fn no_split() -> Self {
        Detection {
            fake_count: 0,
            partition: None,
        }
    }
}

/// Splits feeds into authentic and outlier groups with a linkage-ratio rule.
///
/// The feed rows of a score matrix are clustered hierarchically; when the
/// final merge height dominates the previous one by more than the configured
/// ratio, the tree is cut into two clusters and the smaller one is flagged.
#[derive(Clone, Debug)]
pub struct ConsensusClusterer {
    method: LinkageMethod,
}

impl Default for ConsensusClusterer {
    fn default() -> Self {
        ConsensusClusterer::new(LinkageMethod::default())
    }
}

impl ConsensusClusterer {
    pub fn new(method: LinkageMethod) -> Self {
        ConsensusClusterer { method }
    }

    pub fn method(&self) -> LinkageMethod {
        self.method
    }

    /// Runs the ratio rule against `matrix` at the given threshold.
    pub fn detect(&self, matrix: &ScoreMatrix, ratio_threshold: f64) -> Result<Detection, MvvError> {
        if !ratio_threshold.is_finite() || ratio_threshold <= 0.0 {
            return Err(MvvError::invalid_input(format!(
                "ratio threshold must be finite and positive, got {ratio_threshold}"
            )));
        }

        let tree = linkage(matrix, self.method)?;
        let Some((prev, last)) = tree.last_two_distances() else {
            return Ok(Detection::no_split());
        };

        // A zero-height penultimate merge under a taller root means the
        // final join is infinitely sharper than the rest; treat it as
        // exceeding any threshold. Two zero heights mean the rows are
        // indistinguishable and nothing is flagged.
        let split = if prev == 0.0 {
            last > 0.0
        } else {
            last / prev > ratio_threshold
        };
        if !split {
            return Ok(Detection::no_split());
        }

        let labels = tree
            .cut_two()
            .ok_or_else(|| MvvError::numerical_issue("two-cluster cut missing after split"))?;
        let first_size = labels.iter().filter(|&&label| label == 1).count();
        let second_size = labels.len() - first_size;

        // Minority cluster is the outlier group. When the clusters tie at
        // three feeds each, the cluster containing feed 0 is taken as
        // authentic so the decision stays deterministic.
        let outlier_label = if first_size < second_size {
            1
        } else if second_size < first_size {
            2
        } else if labels[0] == 1 {
            2
        } else {
            1
        };

        let partition: Vec<bool> = labels.iter().map(|&label| label == outlier_label).collect();
        let fake_count = partition.iter().filter(|&&flagged| flagged).count();
        Ok(Detection {
            fake_count,
            partition: Some(partition),
        })
    }
}
