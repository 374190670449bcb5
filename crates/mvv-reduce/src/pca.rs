// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_core::MvvError;

const STD_FLOOR: f64 = f64::EPSILON * 1.0e6;
const JACOBI_MAX_SWEEPS: usize = 64;
const JACOBI_OFF_DIAGONAL_TOL: f64 = 1.0e-12;

/// Standardizes each column of `data` (row-major, `n` x `d`) to zero mean
/// and unit variance in place.
///
/// Columns with near-zero spread are centered only; their scale is floored
/// so constant landmarks survive without blowing up.
pub fn standardize_columns(data: &mut [f64], n: usize, d: usize) -> Result<(), MvvError> {
    if n == 0 || d == 0 || data.len() != n * d {
        return Err(MvvError::invalid_input(format!(
            "standardize shape mismatch: len={}, n={n}, d={d}",
            data.len()
        )));
    }

    for col in 0..d {
        let mut mean = 0.0;
        for row in 0..n {
            mean += data[row * d + col];
        }
        mean /= n as f64;

        let mut var = 0.0;
        for row in 0..n {
            let centered = data[row * d + col] - mean;
            var += centered * centered;
        }
        var /= n as f64;
        let std = var.sqrt().max(STD_FLOOR);

        for row in 0..n {
            let cell = &mut data[row * d + col];
            *cell = (*cell - mean) / std;
        }
    }
    Ok(())
}

/// Sample covariance matrix (`d` x `d`, row-major) of row-major `n` x `d` data.
pub fn column_covariance(data: &[f64], n: usize, d: usize) -> Result<Vec<f64>, MvvError> {
    if n < 2 {
        return Err(MvvError::insufficient_samples(format!(
            "covariance requires n >= 2; got n={n}"
        )));
    }
    if data.len() != n * d {
        return Err(MvvError::invalid_input(format!(
            "covariance shape mismatch: len={}, n={n}, d={d}",
            data.len()
        )));
    }

    let mut means = vec![0.0; d];
    for row in 0..n {
        for col in 0..d {
            means[col] += data[row * d + col];
        }
    }
    for mean in &mut means {
        *mean /= n as f64;
    }

    let mut cov = vec![0.0; d * d];
    for row in 0..n {
        for i in 0..d {
            let centered_i = data[row * d + i] - means[i];
            for j in 0..=i {
                cov[i * d + j] += centered_i * (data[row * d + j] - means[j]);
            }
        }
    }
    let divisor = (n - 1) as f64;
    for i in 0..d {
        for j in 0..=i {
            let value = cov[i * d + j] / divisor;
            cov[i * d + j] = value;
            cov[j * d + i] = value;
        }
    }
    Ok(cov)
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues and the corresponding eigenvectors as columns of a
/// row-major `d` x `d` matrix, unsorted. Deterministic for a fixed input.
pub fn jacobi_eigen(mut matrix: Vec<f64>, d: usize) -> Result<(Vec<f64>, Vec<f64>), MvvError> {
    if d == 0 || matrix.len() != d * d {
        return Err(MvvError::invalid_input(format!(
            "jacobi shape mismatch: len={}, d={d}",
            matrix.len()
        )));
    }
    for value in &matrix {
        if !value.is_finite() {
            return Err(MvvError::numerical_issue(
                "non-finite entry in symmetric eigenproblem",
            ));
        }
    }

    let mut vectors = vec![0.0; d * d];
    for i in 0..d {
        vectors[i * d + i] = 1.0;
    }
    if d == 1 {
        return Ok((vec![matrix[0]], vectors));
    }

    for _sweep in 0..JACOBI_MAX_SWEEPS {
        let mut off_diagonal = 0.0;
        for p in 0..d {
            for q in (p + 1)..d {
                off_diagonal += matrix[p * d + q] * matrix[p * d + q];
            }
        }
        if off_diagonal.sqrt() <= JACOBI_OFF_DIAGONAL_TOL {
            break;
        }

        for p in 0..(d - 1) {
            for q in (p + 1)..d {
                let apq = matrix[p * d + q];
                if apq.abs() <= JACOBI_OFF_DIAGONAL_TOL {
                    continue;
                }

                let theta = (matrix[q * d + q] - matrix[p * d + p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..d {
                    let akp = matrix[k * d + p];
                    let akq = matrix[k * d + q];
                    matrix[k * d + p] = c * akp - s * akq;
                    matrix[k * d + q] = s * akp + c * akq;
                }
                for k in 0..d {
                    let apk = matrix[p * d + k];
                    let aqk = matrix[q * d + k];
                    matrix[p * d + k] = c * apk - s * aqk;
                    matrix[q * d + k] = s * apk + c * aqk;
                }
                for k in 0..d {
                    let vkp = vectors[k * d + p];
                    let vkq = vectors[k * d + q];
                    vectors[k * d + p] = c * vkp - s * vkq;
                    vectors[k * d + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..d).map(|i| matrix[i * d + i]).collect();
    Ok((eigenvalues, vectors))
}

/// Projects row-major `n` x `d` data onto its top `k` principal directions.
///
/// The input is expected to be pre-standardized; returns the projected
/// `n` x `k` score matrix. Component order is by descending eigenvalue,
/// ties broken by original column index for determinism.
pub fn project_principal_components(
    data: &[f64],
    n: usize,
    d: usize,
    k: usize,
) -> Result<Vec<f64>, MvvError> {
    if k == 0 {
        return Err(MvvError::invalid_input("num_components must be >= 1"));
    }
    if k > d {
        return Err(MvvError::invalid_input(format!(
            "num_components {k} exceeds feature dimension {d}"
        )));
    }

    let covariance = column_covariance(data, n, d)?;
    let (eigenvalues, vectors) = jacobi_eigen(covariance, d)?;

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| {
        eigenvalues[b]
            .total_cmp(&eigenvalues[a])
            .then_with(|| a.cmp(&b))
    });

    let mut projected = vec![0.0; n * k];
    for row in 0..n {
        for (out_col, &component) in order[..k].iter().enumerate() {
            let mut dot = 0.0;
            for col in 0..d {
                dot += data[row * d + col] * vectors[col * d + component];
            }
            projected[row * k + out_col] = dot;
        }
    }
    Ok(projected)
}
