// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::{FeedSegment, MvvError};

const FRAC_1_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Maximum useful Haar decomposition depth for a signal of length `n`.
pub fn max_level(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    (usize::BITS - 1 - n.leading_zeros()) as usize
}

/// One Haar analysis step: orthonormal pairwise averages and differences.
///
/// Odd-length inputs extend symmetrically by repeating the final sample.
fn haar_step(signal: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let pairs = signal.len().div_ceil(2);
    let mut approx = Vec::with_capacity(pairs);
    let mut detail = Vec::with_capacity(pairs);
    for pair in 0..pairs {
        let left = signal[2 * pair];
        let right = if 2 * pair + 1 < signal.len() {
            signal[2 * pair + 1]
        } else {
            left
        };
        approx.push((left + right) * FRAC_1_SQRT_2);
        detail.push((left - right) * FRAC_1_SQRT_2);
    }
    (approx, detail)
}

/// Multi-level Haar decomposition of one signal to its maximum valid depth.
///
/// Returns all coefficients flattened as `[approx_L, detail_L, ..., detail_1]`.
pub fn haar_decompose(signal: &[f64]) -> Result<Vec<f64>, MvvError> {
    if signal.len() < 2 {
        return Err(MvvError::insufficient_samples(format!(
            "haar decomposition requires >= 2 samples; got {}",
            signal.len()
        )));
    }
    for (index, value) in signal.iter().enumerate() {
        if !value.is_finite() {
            return Err(MvvError::numerical_issue(format!(
                "non-finite sample at index {index}"
            )));
        }
    }

    let levels = max_level(signal.len());
    let mut details: Vec<Vec<f64>> = Vec::with_capacity(levels);
    let mut current = signal.to_vec();
    for _level in 0..levels {
        if current.len() < 2 {
            break;
        }
        let (approx, detail) = haar_step(&current);
        details.push(detail);
        current = approx;
    }

    let mut flattened = current;
    for detail in details.into_iter().rev() {
        flattened.extend(detail);
    }
    Ok(flattened)
}

/// Decomposes every landmark column of a segment and concatenates the
/// sub-band coefficients into one flat feature vector for the feed.
pub fn decompose_segment(segment: FeedSegment<'_>) -> Result<Vec<f64>, MvvError> {
    let frames = segment.frames();
    let dims = segment.dims();

    let mut features = Vec::new();
    let mut column = vec![0.0; frames];
    for col in 0..dims {
        for t in 0..frames {
            column[t] = segment.frame(t)[col];
        }
        features.extend(haar_decompose(&column)?);
    }
    Ok(features)
}
