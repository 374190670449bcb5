// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON recording loading for the `mvv` binary.

#![forbid(unsafe_code)]

use mvv_core::{FeedMatrix, MvvError, Recording, NUM_FEEDS, NUM_VARIANTS};
use serde::Deserialize;

/// On-disk recording layout: six authentic feeds plus three forged variants
/// keyed by camera (variant `v` is the forged capture of feed `v + 1`), each
/// a frames-by-dims matrix of landmark coordinates, and the annotated
/// interval as `[fake_start, fake_end)` frame indices.
#[derive(Debug, Deserialize)]
pub struct RecordingFile {
    pub authentic: Vec<Vec<Vec<f64>>>,
    pub forged: Vec<Vec<Vec<f64>>>,
    pub fake_start: usize,
    pub fake_end: usize,
}

fn feed_from_rows(label: &str, index: usize, rows: &[Vec<f64>]) -> Result<FeedMatrix, MvvError> {
    let frames = rows.len();
    let dims = rows.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(frames * dims);
    for (frame, row) in rows.iter().enumerate() {
        if row.len() != dims {
            return Err(MvvError::invalid_input(format!(
                "{label} feed {index}: frame {frame} has {} values, expected {dims}",
                row.len()
            )));
        }
        data.extend_from_slice(row);
    }
    FeedMatrix::new(data, frames, dims)
}

impl RecordingFile {
    /// Validates the file structure into a [`Recording`].
    pub fn into_recording(self) -> Result<Recording, MvvError> {
        if self.authentic.len() != NUM_FEEDS {
            return Err(MvvError::invalid_input(format!(
                "recording needs {NUM_FEEDS} authentic feeds, found {}",
                self.authentic.len()
            )));
        }
        if self.forged.len() != NUM_VARIANTS {
            return Err(MvvError::invalid_input(format!(
                "recording needs {NUM_VARIANTS} forged variants, found {}",
                self.forged.len()
            )));
        }
        let authentic = self
            .authentic
            .iter()
            .enumerate()
            .map(|(index, rows)| feed_from_rows("authentic", index, rows))
            .collect::<Result<Vec<_>, _>>()?;
        let forged = self
            .forged
            .iter()
            .enumerate()
            .map(|(index, rows)| feed_from_rows("forged", index, rows))
            .collect::<Result<Vec<_>, _>>()?;
        Recording::new(authentic, forged, self.fake_start, self.fake_end)
    }
}

/// Parses a JSON recording document.
pub fn parse_recording(json: &str) -> Result<Recording, MvvError> {
    let file: RecordingFile = serde_json::from_str(json)
        .map_err(|err| MvvError::invalid_input(format!("invalid recording JSON: {err}")))?;
    file.into_recording()
}

/// CLI namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (
        mvv_core::crate_name(),
        mvv_reduce::crate_name(),
        mvv_consensus::crate_name(),
        mvv_eval::crate_name(),
    );
    "mvv-cli"
}
