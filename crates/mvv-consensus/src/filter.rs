// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::{MvvError, ScoreMatrix};

/// Default tracking-failure score threshold, in native score units.
pub const DEFAULT_DEGENERACY_THRESHOLD: f64 = 10.0;

/// Strips time columns where tracking quality on the all-authentic baseline
/// is unreliable.
///
/// A column is dropped from every matrix when any baseline entry in it
/// reaches the degeneracy threshold or is non-finite; landmark-tracking
/// failures on authentic feeds must not be misread as forgery signal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegeneracyFilter {
    threshold: f64,
}

impl Default for DegeneracyFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEGENERACY_THRESHOLD,
        }
    }
}

impl DegeneracyFilter {
    pub fn new(threshold: f64) -> Result<Self, MvvError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(MvvError::invalid_input(format!(
                "degeneracy threshold must be finite and > 0; got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Column indices of the baseline that survive filtering, ascending.
    pub fn surviving_columns(&self, baseline: &ScoreMatrix) -> Vec<usize> {
        (0..baseline.cols())
            .filter(|&col| {
                (0..baseline.rows()).all(|row| {
                    let score = baseline.get(row, col);
                    score.is_finite() && score < self.threshold
                })
            })
            .collect()
    }

    /// Applies the baseline-derived mask to the baseline and every
    /// hypothesis matrix.
    ///
    /// All inputs must share column indexing. Errors with `DegenerateWindow`
    /// when no column survives.
    pub fn apply(
        &self,
        baseline: &ScoreMatrix,
        hypotheses: &[ScoreMatrix],
    ) -> Result<(ScoreMatrix, Vec<ScoreMatrix>), MvvError> {
        for (index, hypothesis) in hypotheses.iter().enumerate() {
            if hypothesis.cols() != baseline.cols() {
                return Err(MvvError::invalid_input(format!(
                    "hypothesis {index} has {} columns, baseline has {}",
                    hypothesis.cols(),
                    baseline.cols()
                )));
            }
        }

        let keep = self.surviving_columns(baseline);
        if keep.is_empty() {
            return Err(MvvError::degenerate_window(format!(
                "all {} columns exceed the degeneracy threshold {}",
                baseline.cols(),
                self.threshold
            )));
        }

        let filtered_baseline = baseline.select_columns(&keep)?;
        let filtered_hypotheses = hypotheses
            .iter()
            .map(|hypothesis| hypothesis.select_columns(&keep))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((filtered_baseline, filtered_hypotheses))
    }
}
