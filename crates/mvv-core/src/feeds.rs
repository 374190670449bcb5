// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::MvvError;

/// Number of synchronized camera feeds per recording.
pub const NUM_FEEDS: usize = 6;

/// Number of forged variant feeds per recording, one per swappable camera:
/// variant `v` replaces authentic feed `v + 1`.
pub const NUM_VARIANTS: usize = 3;

/// Owned frames-by-dimensions landmark matrix for one camera feed.
///
/// Row-major storage: frame `t` occupies `data[t * dims .. (t + 1) * dims]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FeedMatrix {
    data: Vec<f64>,
    frames: usize,
    dims: usize,
}

impl FeedMatrix {
    /// Constructs a validated `FeedMatrix`.
    pub fn new(data: Vec<f64>, frames: usize, dims: usize) -> Result<Self, MvvError> {
        if frames == 0 {
            return Err(MvvError::invalid_input("frames must be >= 1"));
        }
        if dims == 0 {
            return Err(MvvError::invalid_input("dims must be >= 1"));
        }

        let expected_len = frames
            .checked_mul(dims)
            .ok_or_else(|| MvvError::invalid_input("frames*dims overflow while validating shape"))?;
        if data.len() != expected_len {
            return Err(MvvError::invalid_input(format!(
                "value length mismatch: got {}, expected {expected_len} (frames={frames}, dims={dims})",
                data.len()
            )));
        }

        Ok(Self { data, frames, dims })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Landmark vector of frame `t`.
    pub fn frame(&self, t: usize) -> &[f64] {
        &self.data[t * self.dims..(t + 1) * self.dims]
    }

    /// Borrowed view over frames `[start, end)`.
    pub fn segment(&self, start: usize, end: usize) -> Result<FeedSegment<'_>, MvvError> {
        if start >= end {
            return Err(MvvError::invalid_input(format!(
                "segment requires start < end; got [{start}, {end})"
            )));
        }
        if end > self.frames {
            return Err(MvvError::invalid_input(format!(
                "segment end {end} exceeds frame count {}",
                self.frames
            )));
        }
        Ok(FeedSegment {
            data: &self.data[start * self.dims..end * self.dims],
            frames: end - start,
            dims: self.dims,
        })
    }

    /// The whole matrix as a single segment.
    pub fn full(&self) -> FeedSegment<'_> {
        FeedSegment {
            data: &self.data,
            frames: self.frames,
            dims: self.dims,
        }
    }

    /// Copy truncated to the first `frames` frames.
    pub fn truncated(&self, frames: usize) -> Result<Self, MvvError> {
        if frames == 0 || frames > self.frames {
            return Err(MvvError::invalid_input(format!(
                "truncation length {frames} outside [1, {}]",
                self.frames
            )));
        }
        Ok(Self {
            data: self.data[..frames * self.dims].to_vec(),
            frames,
            dims: self.dims,
        })
    }
}

/// Borrowed window of a [`FeedMatrix`].
#[derive(Clone, Copy, Debug)]
pub struct FeedSegment<'a> {
    data: &'a [f64],
    frames: usize,
    dims: usize,
}

impl<'a> FeedSegment<'a> {
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn frame(&self, t: usize) -> &'a [f64] {
        &self.data[t * self.dims..(t + 1) * self.dims]
    }

    /// Raw row-major values, `frames * dims` long.
    pub fn values(&self) -> &'a [f64] {
        self.data
    }
}

/// One participant's recording: six authentic feeds, three forged variants,
/// and the ground-truth interval the variants were forged over.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    authentic: Vec<FeedMatrix>,
    forged: Vec<FeedMatrix>,
    fake_start: usize,
    fake_end: usize,
}

impl Recording {
    /// Constructs a validated `Recording`.
    ///
    /// All feeds are truncated to the shortest frame count among them so the
    /// matrices stay aligned, matching how multi-take captures are loaded.
    pub fn new(
        authentic: Vec<FeedMatrix>,
        forged: Vec<FeedMatrix>,
        fake_start: usize,
        fake_end: usize,
    ) -> Result<Self, MvvError> {
        if authentic.len() != NUM_FEEDS {
            return Err(MvvError::invalid_input(format!(
                "expected {NUM_FEEDS} authentic feeds, got {}",
                authentic.len()
            )));
        }
        if forged.len() != NUM_VARIANTS {
            return Err(MvvError::invalid_input(format!(
                "expected {NUM_VARIANTS} forged variant feeds, got {}",
                forged.len()
            )));
        }

        let dims = authentic[0].dims();
        for (index, feed) in authentic.iter().chain(forged.iter()).enumerate() {
            if feed.dims() != dims {
                return Err(MvvError::invalid_input(format!(
                    "feed {index} has dims {}, expected {dims}",
                    feed.dims()
                )));
            }
        }

        let frames = authentic
            .iter()
            .chain(forged.iter())
            .map(FeedMatrix::frames)
            .min()
            .unwrap_or(0);
        let authentic = authentic
            .into_iter()
            .map(|feed| feed.truncated(frames))
            .collect::<Result<Vec<_>, _>>()?;
        let forged = forged
            .into_iter()
            .map(|feed| feed.truncated(frames))
            .collect::<Result<Vec<_>, _>>()?;

        if fake_start >= fake_end {
            return Err(MvvError::invalid_input(format!(
                "fake interval requires start < end; got [{fake_start}, {fake_end})"
            )));
        }
        if fake_end > frames {
            return Err(MvvError::invalid_input(format!(
                "fake interval end {fake_end} exceeds aligned frame count {frames}"
            )));
        }

        Ok(Self {
            authentic,
            forged,
            fake_start,
            fake_end,
        })
    }

    pub fn frames(&self) -> usize {
        self.authentic[0].frames()
    }

    pub fn dims(&self) -> usize {
        self.authentic[0].dims()
    }

    pub fn authentic(&self, feed: usize) -> &FeedMatrix {
        &self.authentic[feed]
    }

    /// Forged variant captured for camera `feed`.
    ///
    /// Feeds `1..=NUM_VARIANTS` have forged counterparts; each swapped
    /// camera carries its own forged stream, not a shared one.
    pub fn forged_for_feed(&self, feed: usize) -> Result<&FeedMatrix, MvvError> {
        if feed == 0 || feed > NUM_VARIANTS {
            return Err(MvvError::invalid_input(format!(
                "no forged variant for feed {feed}; feeds 1..={NUM_VARIANTS} have one"
            )));
        }
        Ok(&self.forged[feed - 1])
    }

    /// Ground-truth forged interval as `[start, end)` frame indices.
    pub fn fake_interval(&self) -> (usize, usize) {
        (self.fake_start, self.fake_end)
    }
}
