//! Vector Statistics
//!
//! Mean/std/quantile/covariance utilities shared by every detector, plus
//! the distribution-divergence helpers (KL, Jensen-Shannon) used by the
//! statistical scorer and the drift detector.

pub mod matrix;


use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::DetectionError;

// ============================================================================
// BASELINE STATISTICS
// ============================================================================

/// Per-feature reference statistics a detector scores against.
///
/// Owned by the caller; detectors borrow it read-only. The optional full
/// covariance matrix enables Mahalanobis scoring, otherwise detectors fall
/// back to a diagonal covariance built from `std`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineStatistics {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    #[serde(skip)]
    pub covariance: Option<Array2<f64>>,
}

impl BaselineStatistics {
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> Self {
        Self { mean, std, covariance: None }
    }

    pub fn with_covariance(mean: Vec<f64>, std: Vec<f64>, covariance: Array2<f64>) -> Self {
        Self { mean, std, covariance: Some(covariance) }
    }

    /// Compute baseline statistics (including full covariance) from a batch.
    pub fn from_samples(rows: &[Vec<f64>]) -> Result<Self, DetectionError> {
        if rows.is_empty() {
            return Err(DetectionError::EmptyBatch);
        }
        let dim = rows[0].len();
        for row in rows {
            if row.len() != dim {
                return Err(DetectionError::DimensionMismatch { expected: dim, actual: row.len() });
            }
        }

        let mean = feature_means(rows);
        let std = feature_stds(rows, &mean);
        let covariance = covariance_matrix(rows, &mean);
        Ok(Self { mean, std, covariance: Some(covariance) })
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Diagonal covariance from the per-feature std, for baselines built
    /// without the full matrix.
    pub fn diagonal_covariance(&self) -> Array2<f64> {
        let n = self.mean.len();
        let mut cov = Array2::zeros((n, n));
        for i in 0..n {
            cov[[i, i]] = self.std[i] * self.std[i];
        }
        cov
    }
}

// ============================================================================
// SCALAR STATISTICS
// ============================================================================

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Quantile with linear interpolation. `q` is clamped to [0,1].
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

// ============================================================================
// BATCH STATISTICS
// ============================================================================

/// Per-feature means over a batch of equal-length rows.
pub fn feature_means(rows: &[Vec<f64>]) -> Vec<f64> {
    if rows.is_empty() {
        return vec![];
    }
    let dim = rows[0].len();
    let mut means = vec![0.0; dim];
    for row in rows {
        for (i, v) in row.iter().enumerate() {
            means[i] += v;
        }
    }
    for m in &mut means {
        *m /= rows.len() as f64;
    }
    means
}

/// Per-feature population stds over a batch.
pub fn feature_stds(rows: &[Vec<f64>], means: &[f64]) -> Vec<f64> {
    if rows.is_empty() {
        return vec![];
    }
    let dim = means.len();
    let mut vars = vec![0.0; dim];
    for row in rows {
        for i in 0..dim {
            let d = row[i] - means[i];
            vars[i] += d * d;
        }
    }
    vars.iter().map(|v| (v / rows.len() as f64).sqrt()).collect()
}

/// Sample covariance matrix (n-1 denominator, n=1 degenerates to zeros).
pub fn covariance_matrix(rows: &[Vec<f64>], means: &[f64]) -> Array2<f64> {
    let dim = means.len();
    let mut cov = Array2::zeros((dim, dim));
    if rows.len() < 2 {
        return cov;
    }
    let denom = (rows.len() - 1) as f64;
    for row in rows {
        for i in 0..dim {
            let di = row[i] - means[i];
            for j in i..dim {
                let dj = row[j] - means[j];
                cov[[i, j]] += di * dj / denom;
            }
        }
    }
    // Mirror the upper triangle
    for i in 0..dim {
        for j in 0..i {
            cov[[i, j]] = cov[[j, i]];
        }
    }
    cov
}

// ============================================================================
// DISTRIBUTION DIVERGENCE
// ============================================================================

const DIVERGENCE_FLOOR: f64 = 1e-10;

/// KL divergence of two aligned probability vectors. Inputs need not be
/// normalized; zero entries are floored to keep the log finite.
fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    let p_sum: f64 = p.iter().sum::<f64>().max(DIVERGENCE_FLOOR);
    let q_sum: f64 = q.iter().sum::<f64>().max(DIVERGENCE_FLOOR);
    p.iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| {
            let pn = (pi / p_sum).max(DIVERGENCE_FLOOR);
            let qn = (qi / q_sum).max(DIVERGENCE_FLOOR);
            pn * (pn / qn).ln()
        })
        .sum()
}

/// Jensen-Shannon distance: sqrt of the average KL to the mixture.
/// Symmetric and bounded by sqrt(ln 2); returns 0.0 for identical inputs.
pub fn jensen_shannon_distance(p: &[f64], q: &[f64]) -> f64 {
    if p.len() != q.len() || p.is_empty() {
        return 0.0;
    }
    let m: Vec<f64> = p.iter().zip(q.iter()).map(|(&a, &b)| 0.5 * (a + b)).collect();
    let js = 0.5 * kl_divergence(p, &m) + 0.5 * kl_divergence(q, &m);
    js.max(0.0).sqrt()
}
