// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod pca;
pub mod robust;
pub mod wavelet;

pub use robust::{McdConfig, RobustEstimate};

use mvv_core::{FeedSegment, MvvError, ScoreMatrix, NUM_FEEDS};

pub const DEFAULT_NUM_COMPONENTS: usize = 5;

/// Feature reduction capability: turns six aligned feed segments into a
/// per-feed anomaly score matrix.
///
/// Implementations may emit one score per frame (per-frame strategies) or a
/// single aggregate score per feed; callers treat both uniformly through the
/// returned [`ScoreMatrix`] shape.
pub trait ScoreReducer {
    /// Stable strategy label for diagnostics.
    fn label(&self) -> &'static str;

    /// Reduces six aligned feed segments to non-negative anomaly scores.
    fn reduce(&self, feeds: &[FeedSegment<'_>]) -> Result<ScoreMatrix, MvvError>;
}

fn validate_feed_set(feeds: &[FeedSegment<'_>]) -> Result<(usize, usize), MvvError> {
    if feeds.len() != NUM_FEEDS {
        return Err(MvvError::invalid_input(format!(
            "expected {NUM_FEEDS} feed segments, got {}",
            feeds.len()
        )));
    }
    let frames = feeds[0].frames();
    let dims = feeds[0].dims();
    for (index, feed) in feeds.iter().enumerate() {
        if feed.frames() != frames || feed.dims() != dims {
            return Err(MvvError::invalid_input(format!(
                "feed segment {index} is {}x{}, expected {frames}x{dims}",
                feed.frames(),
                feed.dims()
            )));
        }
    }
    Ok((frames, dims))
}

/// Configuration for [`PcaMahalanobis`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PcaMahalanobisConfig {
    /// Number of principal directions retained before the robust fit.
    pub num_components: usize,
    pub mcd: McdConfig,
}

impl Default for PcaMahalanobisConfig {
    fn default() -> Self {
        Self {
            num_components: DEFAULT_NUM_COMPONENTS,
            mcd: McdConfig::default(),
        }
    }
}

impl PcaMahalanobisConfig {
    fn validate(&self) -> Result<(), MvvError> {
        if self.num_components == 0 {
            return Err(MvvError::invalid_input(
                "PcaMahalanobisConfig.num_components must be >= 1; got 0",
            ));
        }
        self.mcd.validate()
    }
}

/// Per-frame reducer: standardized principal-component projection followed
/// by robust Mahalanobis scoring against an MCD location/scatter estimate.
#[derive(Clone, Debug)]
pub struct PcaMahalanobis {
    config: PcaMahalanobisConfig,
}

impl PcaMahalanobis {
    pub fn new(config: PcaMahalanobisConfig) -> Result<Self, MvvError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PcaMahalanobisConfig {
        &self.config
    }

    /// Scores a single feed segment: one squared robust Mahalanobis distance
    /// per frame.
    pub fn score_feed(&self, segment: FeedSegment<'_>) -> Result<Vec<f64>, MvvError> {
        let frames = segment.frames();
        let dims = segment.dims();
        let k = self.config.num_components;
        if frames <= k {
            return Err(MvvError::insufficient_samples(format!(
                "segment length {frames} must exceed num_components {k}"
            )));
        }
        if k > dims {
            return Err(MvvError::invalid_input(format!(
                "num_components {k} exceeds landmark dimension {dims}"
            )));
        }

        let mut data = segment.values().to_vec();
        pca::standardize_columns(&mut data, frames, dims)?;
        let projected = pca::project_principal_components(&data, frames, dims, k)?;
        let estimate = robust::fit_mcd(&projected, frames, k, &self.config.mcd)?;
        robust::mahalanobis_squared(&projected, frames, k, &estimate)
    }
}

impl ScoreReducer for PcaMahalanobis {
    fn label(&self) -> &'static str {
        "pca-mahalanobis"
    }

    fn reduce(&self, feeds: &[FeedSegment<'_>]) -> Result<ScoreMatrix, MvvError> {
        validate_feed_set(feeds)?;
        let rows = feeds
            .iter()
            .map(|&feed| self.score_feed(feed))
            .collect::<Result<Vec<_>, _>>()?;
        ScoreMatrix::from_rows(rows)
    }
}

/// Aggregate reducer: full multiresolution Haar decomposition per feed,
/// robust distance of each feed's coefficient vector from the set's
/// diagonal median/MAD estimate. One score per feed.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaveletMahalanobis;

impl WaveletMahalanobis {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreReducer for WaveletMahalanobis {
    fn label(&self) -> &'static str {
        "wavelet-mahalanobis"
    }

    fn reduce(&self, feeds: &[FeedSegment<'_>]) -> Result<ScoreMatrix, MvvError> {
        validate_feed_set(feeds)?;
        let vectors = feeds
            .iter()
            .map(|&feed| wavelet::decompose_segment(feed))
            .collect::<Result<Vec<_>, _>>()?;
        let scores = robust::diagonal_robust_scores(&vectors)?;
        ScoreMatrix::from_rows(scores.into_iter().map(|score| vec![score]).collect())
    }
}

/// Feature reduction crate name helper.
pub fn crate_name() -> &'static str {
    let _ = mvv_core::crate_name();
    "mvv-reduce"
}
