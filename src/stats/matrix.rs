//! Matrix Inversion & Distance Metrics
//!
//! Regularized covariance inversion with an explicit tagged outcome, so
//! callers choose the Euclidean fallback without error-based control flow.

use ndarray::{Array1, Array2};

/// Outcome of a regularized inversion attempt. `Singular` means the matrix
/// stayed non-invertible even after regularization.
#[derive(Debug, Clone)]
pub enum InverseOutcome {
    Inverted(Array2<f64>),
    Singular,
}

/// Pivots smaller than this are treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Invert `cov + epsilon * I` by Gauss-Jordan elimination with partial
/// pivoting. Never panics; a vanishing pivot yields `Singular`.
pub fn regularized_inverse(cov: &Array2<f64>, epsilon: f64) -> InverseOutcome {
    let n = cov.nrows();
    if n == 0 || cov.ncols() != n {
        return InverseOutcome::Singular;
    }

    // Augmented [cov + eps*I | I]
    let mut a = cov.clone();
    for i in 0..n {
        a[[i, i]] += epsilon;
    }
    let mut inv = Array2::eye(n);

    for col in 0..n {
        // Partial pivot
        let mut pivot_row = col;
        let mut pivot_val = a[[col, col]].abs();
        for row in (col + 1)..n {
            if a[[row, col]].abs() > pivot_val {
                pivot_val = a[[row, col]].abs();
                pivot_row = row;
            }
        }
        if pivot_val < PIVOT_TOLERANCE {
            return InverseOutcome::Singular;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
                inv.swap([col, k], [pivot_row, k]);
            }
        }

        let pivot = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }

    InverseOutcome::Inverted(inv)
}

/// Mahalanobis distance `sqrt((x-mu)^T Sigma^-1 (x-mu))`.
/// Negative quadratic forms from numerical noise are clamped to zero.
pub fn mahalanobis(x: &[f64], mean: &[f64], inverse: &Array2<f64>) -> f64 {
    let diff: Array1<f64> = x.iter().zip(mean.iter()).map(|(a, b)| a - b).collect();
    let quad = diff.dot(&inverse.dot(&diff));
    quad.max(0.0).sqrt()
}

/// Plain Euclidean distance, the fallback when the covariance is singular.
pub fn euclidean(x: &[f64], mean: &[f64]) -> f64 {
    x.iter()
        .zip(mean.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}
