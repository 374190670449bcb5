// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::MvvError;

const DEFAULT_NUM_STARTS: usize = 24;
const DEFAULT_MAX_C_STEPS: usize = 30;
const DEFAULT_SEED: u64 = 0;
const JITTER_ATTEMPTS: usize = 6;
const MAD_NORMAL_CONSISTENCY: f64 = 1.4826;
const SCALE_FLOOR: f64 = f64::EPSILON * 1.0e6;

/// Configuration for the minimum-covariance-determinant fit.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct McdConfig {
    /// Fraction of samples the robust fit is anchored on; `None` uses the
    /// breakdown-optimal `ceil((n + p + 1) / 2)`.
    pub support_fraction: Option<f64>,
    /// Number of deterministically seeded random starts.
    pub num_starts: usize,
    /// Concentration-step cap per start.
    pub max_c_steps: usize,
    /// Seed for the splitmix64 start sampler.
    pub seed: u64,
}

impl Default for McdConfig {
    fn default() -> Self {
        Self {
            support_fraction: None,
            num_starts: DEFAULT_NUM_STARTS,
            max_c_steps: DEFAULT_MAX_C_STEPS,
            seed: DEFAULT_SEED,
        }
    }
}

impl McdConfig {
    pub fn validate(&self) -> Result<(), MvvError> {
        if let Some(fraction) = self.support_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(MvvError::invalid_input(format!(
                    "McdConfig.support_fraction must be in (0, 1]; got {fraction}"
                )));
            }
        }
        if self.num_starts == 0 {
            return Err(MvvError::invalid_input(
                "McdConfig.num_starts must be >= 1; got 0",
            ));
        }
        if self.max_c_steps == 0 {
            return Err(MvvError::invalid_input(
                "McdConfig.max_c_steps must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Robust location/scatter estimate fitted by the MCD procedure.
#[derive(Clone, Debug, PartialEq)]
pub struct RobustEstimate {
    pub location: Vec<f64>,
    /// Row-major `dims` x `dims` scatter matrix.
    pub scatter: Vec<f64>,
    pub dims: usize,
    /// Sample indices the winning half-set was concentrated on, ascending.
    pub support: Vec<usize>,
}

/// Deterministic splitmix64 generator for reproducible subset draws.
#[derive(Clone, Copy, Debug)]
struct StableRng {
    state: u64,
}

impl StableRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9e3779b97f4a7c15),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn gen_range(&mut self, upper_exclusive: usize) -> usize {
        debug_assert!(upper_exclusive > 0);
        (self.next_u64() % upper_exclusive as u64) as usize
    }
}

/// Fits a robust location/scatter estimate by FAST-MCD style concentration.
///
/// `points` is row-major `n` x `p`. Errors with `InsufficientSamples` when
/// the sample count cannot support a non-singular scatter.
pub fn fit_mcd(
    points: &[f64],
    n: usize,
    p: usize,
    config: &McdConfig,
) -> Result<RobustEstimate, MvvError> {
    config.validate()?;
    if p == 0 || points.len() != n * p {
        return Err(MvvError::invalid_input(format!(
            "mcd shape mismatch: len={}, n={n}, p={p}",
            points.len()
        )));
    }
    if n <= p {
        return Err(MvvError::insufficient_samples(format!(
            "robust covariance requires more samples than dimensions; got n={n}, p={p}"
        )));
    }

    let h = support_size(n, p, config.support_fraction);
    if h <= p {
        return Err(MvvError::insufficient_samples(format!(
            "support size {h} must exceed dimension {p} (n={n})"
        )));
    }

    if h == n {
        let support: Vec<usize> = (0..n).collect();
        let (location, scatter) = subset_location_scatter(points, n, p, &support);
        return Ok(RobustEstimate {
            location,
            scatter,
            dims: p,
            support,
        });
    }

    let mut rng = StableRng::new(config.seed);
    let mut best: Option<(f64, RobustEstimate)> = None;

    for _start in 0..config.num_starts {
        let mut support = sample_subset(&mut rng, n, h);
        let mut converged_log_det = None;

        for _step in 0..config.max_c_steps {
            let (location, scatter) = subset_location_scatter(points, n, p, &support);
            let Ok(factor) = jittered_cholesky(&scatter, p) else {
                // Singular half-set; abandon this start.
                converged_log_det = None;
                break;
            };

            let mut order: Vec<usize> = (0..n).collect();
            let distances: Vec<f64> = (0..n)
                .map(|row| mahalanobis_squared_one(&points[row * p..(row + 1) * p], &location, &factor, p))
                .collect();
            order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]).then_with(|| a.cmp(&b)));

            let mut next_support = order[..h].to_vec();
            next_support.sort_unstable();

            let log_det = log_det_from_cholesky(&factor, p);
            converged_log_det = Some(log_det);
            if next_support == support {
                break;
            }
            support = next_support;
        }

        let Some(log_det) = converged_log_det else {
            continue;
        };
        let (location, scatter) = subset_location_scatter(points, n, p, &support);
        let candidate = RobustEstimate {
            location,
            scatter,
            dims: p,
            support,
        };
        let replace = match &best {
            None => true,
            Some((best_log_det, _)) => log_det < *best_log_det,
        };
        if replace {
            best = Some((log_det, candidate));
        }
    }

    best.map(|(_, estimate)| estimate).ok_or_else(|| {
        MvvError::numerical_issue(
            "every MCD start produced a singular scatter; data may be rank-deficient",
        )
    })
}

/// Squared Mahalanobis distance of every row of `points` under `estimate`.
pub fn mahalanobis_squared(
    points: &[f64],
    n: usize,
    p: usize,
    estimate: &RobustEstimate,
) -> Result<Vec<f64>, MvvError> {
    if estimate.dims != p || points.len() != n * p {
        return Err(MvvError::invalid_input(format!(
            "mahalanobis shape mismatch: len={}, n={n}, p={p}, estimate dims={}",
            points.len(),
            estimate.dims
        )));
    }

    let factor = jittered_cholesky(&estimate.scatter, p)?;
    let mut out = Vec::with_capacity(n);
    for row in 0..n {
        let distance = mahalanobis_squared_one(
            &points[row * p..(row + 1) * p],
            &estimate.location,
            &factor,
            p,
        );
        if !distance.is_finite() {
            return Err(MvvError::numerical_issue(format!(
                "non-finite Mahalanobis distance for sample {row}"
            )));
        }
        out.push(distance);
    }
    Ok(out)
}

/// Robust per-vector anomaly scores under a diagonal median/MAD estimate.
///
/// Used when the sample count (six feeds) cannot support a full scatter
/// matrix over high-dimensional feature vectors. Returns the mean squared
/// standardized deviation per input vector, so the scores stay on a
/// per-coordinate scale regardless of vector length and downstream
/// saturation filtering applies uniformly.
pub fn diagonal_robust_scores(vectors: &[Vec<f64>]) -> Result<Vec<f64>, MvvError> {
    let n = vectors.len();
    if n < 2 {
        return Err(MvvError::insufficient_samples(format!(
            "diagonal robust scoring requires >= 2 vectors; got {n}"
        )));
    }
    let dims = vectors[0].len();
    if dims == 0 {
        return Err(MvvError::invalid_input("feature vectors must be non-empty"));
    }
    for (index, vector) in vectors.iter().enumerate() {
        if vector.len() != dims {
            return Err(MvvError::invalid_input(format!(
                "feature vector {index} has length {}, expected {dims}",
                vector.len()
            )));
        }
    }

    let mut scores = vec![0.0; n];
    let mut column = vec![0.0; n];
    let mut deviations = vec![0.0; n];
    for j in 0..dims {
        for (i, vector) in vectors.iter().enumerate() {
            column[i] = vector[j];
        }
        let center = median_in_place(&mut column);

        for (i, vector) in vectors.iter().enumerate() {
            deviations[i] = (vector[j] - center).abs();
        }
        let scale = (median_in_place(&mut deviations) * MAD_NORMAL_CONSISTENCY).max(SCALE_FLOOR);

        for (i, vector) in vectors.iter().enumerate() {
            let standardized = (vector[j] - center) / scale;
            scores[i] += standardized * standardized;
        }
    }

    for score in &mut scores {
        *score /= dims as f64;
    }
    for (index, score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(MvvError::numerical_issue(format!(
                "non-finite robust score for vector {index}"
            )));
        }
    }
    Ok(scores)
}

fn support_size(n: usize, p: usize, support_fraction: Option<f64>) -> usize {
    match support_fraction {
        Some(fraction) => ((fraction * n as f64).ceil() as usize).clamp(1, n),
        None => ((n + p + 1) + 1) / 2,
    }
}

fn sample_subset(rng: &mut StableRng, n: usize, h: usize) -> Vec<usize> {
    // Partial Fisher-Yates: the first h slots form the draw.
    let mut indices: Vec<usize> = (0..n).collect();
    for slot in 0..h {
        let pick = slot + rng.gen_range(n - slot);
        indices.swap(slot, pick);
    }
    let mut subset = indices[..h].to_vec();
    subset.sort_unstable();
    subset
}

fn subset_location_scatter(
    points: &[f64],
    _n: usize,
    p: usize,
    support: &[usize],
) -> (Vec<f64>, Vec<f64>) {
    let h = support.len();
    let mut location = vec![0.0; p];
    for &row in support {
        for col in 0..p {
            location[col] += points[row * p + col];
        }
    }
    for value in &mut location {
        *value /= h as f64;
    }

    let mut scatter = vec![0.0; p * p];
    for &row in support {
        for i in 0..p {
            let centered_i = points[row * p + i] - location[i];
            for j in 0..=i {
                scatter[i * p + j] += centered_i * (points[row * p + j] - location[j]);
            }
        }
    }
    let divisor = (h.max(2) - 1) as f64;
    for i in 0..p {
        for j in 0..=i {
            let value = scatter[i * p + j] / divisor;
            scatter[i * p + j] = value;
            scatter[j * p + i] = value;
        }
    }
    (location, scatter)
}

/// Lower-triangular Cholesky factor, retrying with a growing ridge when the
/// matrix is not numerically positive definite.
fn jittered_cholesky(matrix: &[f64], p: usize) -> Result<Vec<f64>, MvvError> {
    let mean_diagonal =
        (0..p).map(|i| matrix[i * p + i].abs()).sum::<f64>() / p as f64;
    let base_jitter = (mean_diagonal * 1.0e-10).max(1.0e-12);

    let mut jitter = 0.0;
    for _attempt in 0..JITTER_ATTEMPTS {
        let mut factor = matrix.to_vec();
        if jitter > 0.0 {
            for i in 0..p {
                factor[i * p + i] += jitter;
            }
        }
        if cholesky_in_place(&mut factor, p).is_ok() {
            return Ok(factor);
        }
        jitter = if jitter == 0.0 { base_jitter } else { jitter * 10.0 };
    }

    Err(MvvError::numerical_issue(
        "scatter matrix is not positive definite even after jitter retries",
    ))
}

fn cholesky_in_place(matrix: &mut [f64], n: usize) -> Result<(), MvvError> {
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i * n + j];
            for k in 0..j {
                sum -= matrix[i * n + k] * matrix[j * n + k];
            }

            if i == j {
                if !sum.is_finite() || sum <= 0.0 {
                    return Err(MvvError::numerical_issue(
                        "covariance is not positive definite",
                    ));
                }
                matrix[i * n + i] = sum.sqrt();
            } else {
                matrix[i * n + j] = sum / matrix[j * n + j];
            }
        }

        for j in i + 1..n {
            matrix[i * n + j] = 0.0;
        }
    }
    Ok(())
}

fn log_det_from_cholesky(factor: &[f64], p: usize) -> f64 {
    (0..p).map(|i| factor[i * p + i].ln()).sum::<f64>() * 2.0
}

fn mahalanobis_squared_one(point: &[f64], location: &[f64], factor: &[f64], p: usize) -> f64 {
    // Solve L z = (x - mu); the squared distance is ||z||^2.
    let mut z = vec![0.0; p];
    for i in 0..p {
        let mut sum = point[i] - location[i];
        for k in 0..i {
            sum -= factor[i * p + k] * z[k];
        }
        z[i] = sum / factor[i * p + i];
    }
    z.iter().map(|value| value * value).sum()
}

fn median_in_place(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::{
        diagonal_robust_scores, fit_mcd, mahalanobis_squared, median_in_place, McdConfig,
    };

    /// Tight 2-D blob around the origin with a handful of far outliers.
    fn blob_with_outliers() -> (Vec<f64>, usize) {
        let mut points = Vec::new();
        let mut n = 0;
        for i in 0..20 {
            let wobble = (i % 5) as f64 * 0.1;
            points.extend_from_slice(&[wobble, -wobble * 0.5]);
            n += 1;
        }
        for _ in 0..4 {
            points.extend_from_slice(&[50.0, 50.0]);
            n += 1;
        }
        (points, n)
    }

    #[test]
    fn config_validation_rejects_bad_fields() {
        let bad_fraction = McdConfig {
            support_fraction: Some(0.0),
            ..McdConfig::default()
        };
        assert!(bad_fraction.validate().is_err());

        let bad_starts = McdConfig {
            num_starts: 0,
            ..McdConfig::default()
        };
        assert!(bad_starts.validate().is_err());
    }

    #[test]
    fn fit_mcd_rejects_more_dimensions_than_samples() {
        let points = vec![0.0; 3 * 4];
        let err = fit_mcd(&points, 3, 4, &McdConfig::default()).expect_err("n<=p must fail");
        assert!(err.to_string().contains("insufficient samples"));
    }

    #[test]
    fn fit_mcd_center_ignores_far_outliers() {
        let (points, n) = blob_with_outliers();
        let estimate = fit_mcd(&points, n, 2, &McdConfig::default()).expect("fit should succeed");

        assert!(estimate.location[0].abs() < 1.0, "robust center should stay near the blob");
        assert!(estimate.location[1].abs() < 1.0);
        // No outlier row may sit in the winning support.
        assert!(estimate.support.iter().all(|&row| row < 20));
    }

    #[test]
    fn outliers_get_much_larger_mahalanobis_distances() {
        let (points, n) = blob_with_outliers();
        let estimate = fit_mcd(&points, n, 2, &McdConfig::default()).expect("fit should succeed");
        let distances =
            mahalanobis_squared(&points, n, 2, &estimate).expect("distances should compute");

        let max_inlier = distances[..20].iter().cloned().fold(0.0, f64::max);
        let min_outlier = distances[20..].iter().cloned().fold(f64::INFINITY, f64::min);
        assert!(
            min_outlier > 10.0 * max_inlier,
            "outliers {min_outlier} should dominate inliers {max_inlier}"
        );
        assert!(distances.iter().all(|distance| *distance >= 0.0));
    }

    #[test]
    fn fit_mcd_is_deterministic_for_a_fixed_seed() {
        let (points, n) = blob_with_outliers();
        let config = McdConfig::default();
        let first = fit_mcd(&points, n, 2, &config).expect("first fit should succeed");
        let second = fit_mcd(&points, n, 2, &config).expect("second fit should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn diagonal_robust_scores_isolate_offset_vector() {
        let mut vectors = vec![vec![0.0; 16]; 5];
        for (i, vector) in vectors.iter_mut().enumerate() {
            for (j, value) in vector.iter_mut().enumerate() {
                *value = ((i + j) % 3) as f64 * 0.1;
            }
        }
        vectors.push(vec![25.0; 16]);

        let scores = diagonal_robust_scores(&vectors).expect("scores should compute");
        let max_regular = scores[..5].iter().cloned().fold(0.0, f64::max);
        assert!(
            scores[5] > 100.0 * (max_regular + 1.0),
            "offset vector should dominate: {scores:?}"
        );
    }

    #[test]
    fn diagonal_robust_scores_reject_ragged_or_tiny_input() {
        let err = diagonal_robust_scores(&[vec![1.0]]).expect_err("single vector must fail");
        assert!(err.to_string().contains("insufficient samples"));

        let err = diagonal_robust_scores(&[vec![1.0, 2.0], vec![1.0]])
            .expect_err("ragged vectors must fail");
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        let mut odd = [3.0, 1.0, 2.0];
        assert_eq!(median_in_place(&mut odd), 2.0);
        let mut even = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(median_in_place(&mut even), 2.5);
    }
}
