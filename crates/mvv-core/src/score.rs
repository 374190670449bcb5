// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{MvvError, NUM_FEEDS};

/// Per-feed anomaly score matrix: one row per feed, one column per time
/// sample (or a single column for aggregate reducer strategies).
///
/// Row-major storage with exactly [`NUM_FEEDS`] rows.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreMatrix {
    data: Vec<f64>,
    cols: usize,
}

impl ScoreMatrix {
    /// Builds a score matrix from per-feed score rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MvvError> {
        if rows.len() != NUM_FEEDS {
            return Err(MvvError::invalid_input(format!(
                "expected {NUM_FEEDS} score rows, got {}",
                rows.len()
            )));
        }

        let cols = rows[0].len();
        if cols == 0 {
            return Err(MvvError::invalid_input("score rows must be non-empty"));
        }
        for (index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(MvvError::invalid_input(format!(
                    "score row {index} has length {}, expected {cols}",
                    row.len()
                )));
            }
        }

        let mut data = Vec::with_capacity(NUM_FEEDS * cols);
        for row in rows {
            data.extend_from_slice(&row);
        }
        Ok(Self { data, cols })
    }

    pub fn rows(&self) -> usize {
        NUM_FEEDS
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, feed: usize) -> &[f64] {
        &self.data[feed * self.cols..(feed + 1) * self.cols]
    }

    pub fn get(&self, feed: usize, col: usize) -> f64 {
        self.data[feed * self.cols + col]
    }

    /// Copy retaining only the columns selected by `keep` (ascending indices).
    pub fn select_columns(&self, keep: &[usize]) -> Result<Self, MvvError> {
        if keep.is_empty() {
            return Err(MvvError::degenerate_window(
                "column selection would leave an empty score matrix",
            ));
        }
        if let Some(&out_of_range) = keep.iter().find(|&&col| col >= self.cols) {
            return Err(MvvError::invalid_input(format!(
                "selected column {out_of_range} out of range (cols={})",
                self.cols
            )));
        }

        let mut data = Vec::with_capacity(NUM_FEEDS * keep.len());
        for feed in 0..NUM_FEEDS {
            let row = self.row(feed);
            for &col in keep {
                data.push(row[col]);
            }
        }
        Ok(Self {
            data,
            cols: keep.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ScoreMatrix;
    use crate::NUM_FEEDS;

    fn ramp_matrix(cols: usize) -> ScoreMatrix {
        let rows = (0..NUM_FEEDS)
            .map(|feed| (0..cols).map(|col| (feed * cols + col) as f64).collect())
            .collect();
        ScoreMatrix::from_rows(rows).expect("test matrix should be valid")
    }

    #[test]
    fn from_rows_accepts_six_equal_length_rows() {
        let matrix = ramp_matrix(4);
        assert_eq!(matrix.rows(), NUM_FEEDS);
        assert_eq!(matrix.cols(), 4);
        assert_eq!(matrix.row(1), &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(matrix.get(2, 3), 11.0);
    }

    #[test]
    fn from_rows_rejects_wrong_row_count_and_ragged_rows() {
        let err = ScoreMatrix::from_rows(vec![vec![1.0]; 5]).expect_err("5 rows must fail");
        assert!(err.to_string().contains("expected 6 score rows"));

        let mut rows = vec![vec![1.0, 2.0]; NUM_FEEDS];
        rows[3] = vec![1.0];
        let err = ScoreMatrix::from_rows(rows).expect_err("ragged rows must fail");
        assert!(err.to_string().contains("score row 3"));

        let err =
            ScoreMatrix::from_rows(vec![vec![]; NUM_FEEDS]).expect_err("empty rows must fail");
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn select_columns_keeps_requested_columns_in_order() {
        let matrix = ramp_matrix(4);
        let selected = matrix
            .select_columns(&[0, 2])
            .expect("selection should succeed");
        assert_eq!(selected.cols(), 2);
        assert_eq!(selected.row(0), &[0.0, 2.0]);
        assert_eq!(selected.row(5), &[20.0, 22.0]);
    }

    #[test]
    fn select_columns_rejects_empty_and_out_of_range_selections() {
        let matrix = ramp_matrix(3);
        let err = matrix.select_columns(&[]).expect_err("empty keep must fail");
        assert!(err.to_string().contains("degenerate window"));

        let err = matrix
            .select_columns(&[0, 3])
            .expect_err("out-of-range column must fail");
        assert!(err.to_string().contains("out of range"));
    }
}
