//! Statistical Anomaly Scorer
//!
//! Mahalanobis distance against a caller-supplied baseline, blended with a
//! KS-like per-feature divergence computed over the batch. Falls back to
//! Euclidean distance when the covariance stays singular after
//! regularization.

use crate::constants::{COVARIANCE_EPSILON, DEFAULT_DISTANCE_LAMBDA};
use crate::ensemble::{AnomalyScore, ScoreMethod};
use crate::error::DetectionError;
use crate::stats::matrix::{euclidean, mahalanobis, regularized_inverse, InverseOutcome};
use crate::stats::{feature_means, feature_stds, BaselineStatistics};

use super::{check_dimensions, Sample};

const STD_FLOOR: f64 = 1e-9;

/// Weight of the distance score vs. the batch divergence score.
const DISTANCE_WEIGHT: f64 = 0.7;
const DIVERGENCE_WEIGHT: f64 = 0.3;

pub struct StatisticalAnomalyScorer {
    lambda: f64,
}

impl Default for StatisticalAnomalyScorer {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE_LAMBDA)
    }
}

impl StatisticalAnomalyScorer {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// Score each sample against the baseline. Output is one score per
    /// sample, each in [0,1], in batch order.
    pub fn score(
        &self,
        samples: &[Sample],
        baseline: &BaselineStatistics,
    ) -> Result<Vec<AnomalyScore>, DetectionError> {
        if samples.is_empty() {
            return Ok(vec![]);
        }
        check_dimensions(samples, baseline)?;

        let covariance = baseline
            .covariance
            .clone()
            .unwrap_or_else(|| baseline.diagonal_covariance());

        let (distances, method) = match regularized_inverse(&covariance, COVARIANCE_EPSILON) {
            InverseOutcome::Inverted(inverse) => {
                let d = samples
                    .iter()
                    .map(|s| mahalanobis(&s.features, &baseline.mean, &inverse))
                    .collect::<Vec<_>>();
                (d, ScoreMethod::Statistical)
            }
            InverseOutcome::Singular => {
                log::warn!("covariance singular after regularization, using Euclidean fallback");
                let d = samples
                    .iter()
                    .map(|s| euclidean(&s.features, &baseline.mean))
                    .collect::<Vec<_>>();
                (d, ScoreMethod::EuclideanFallback)
            }
        };

        let divergences = self.batch_divergences(samples, baseline);

        let scores = samples
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let distance_score = 1.0 - (-self.lambda * distances[i]).exp();
                let combined = DISTANCE_WEIGHT * distance_score + DIVERGENCE_WEIGHT * divergences[i];
                AnomalyScore::new(i, combined, method)
            })
            .collect();

        Ok(scores)
    }

    /// KS-like divergence: how far each feature's observed batch mean/std
    /// sit from the baseline, projected back onto each sample and
    /// normalized by the batch maximum.
    fn batch_divergences(&self, samples: &[Sample], baseline: &BaselineStatistics) -> Vec<f64> {
        let rows: Vec<Vec<f64>> = samples.iter().map(|s| s.features.clone()).collect();
        let observed_mean = feature_means(&rows);
        let observed_std = feature_stds(&rows, &observed_mean);

        let dim = baseline.dimension();
        let mut feature_shift = vec![0.0; dim];
        for f in 0..dim {
            let scale = baseline.std[f].abs().max(STD_FLOOR);
            let mean_shift = (observed_mean[f] - baseline.mean[f]).abs() / scale;
            let std_shift = (observed_std[f] - baseline.std[f]).abs() / scale;
            feature_shift[f] = mean_shift.max(std_shift);
        }

        let raw: Vec<f64> = samples
            .iter()
            .map(|s| {
                (0..dim)
                    .map(|f| {
                        let scale = baseline.std[f].abs().max(STD_FLOOR);
                        let deviation = (s.features[f] - baseline.mean[f]).abs() / scale;
                        feature_shift[f] * deviation
                    })
                    .sum::<f64>()
            })
            .collect();

        let max = raw.iter().cloned().fold(0.0f64, f64::max);
        if max < STD_FLOOR {
            return vec![0.0; samples.len()];
        }
        raw.iter().map(|v| v / max).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_baseline(dim: usize) -> BaselineStatistics {
        BaselineStatistics::new(vec![0.0; dim], vec![1.0; dim])
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let baseline = unit_baseline(4);
        let samples = vec![
            Sample::new(vec![0.1, -0.2, 0.05, 0.3]),
            Sample::new(vec![50.0, 50.0, 50.0, 50.0]),
            Sample::new(vec![-3.0, 2.0, -1.0, 0.5]),
        ];
        let scores = StatisticalAnomalyScorer::default().score(&samples, &baseline).expect("score");
        assert_eq!(scores.len(), 3);
        for s in &scores {
            assert!((0.0..=1.0).contains(&s.score), "score out of range: {}", s.score);
        }
    }

    #[test]
    fn test_outlier_scores_highest() {
        let baseline = unit_baseline(4);
        let mut samples: Vec<Sample> = (0..20)
            .map(|i| Sample::new(vec![0.1 * (i % 3) as f64; 4]))
            .collect();
        samples.push(Sample::new(vec![50.0, 50.0, 50.0, 50.0]));

        let scores = StatisticalAnomalyScorer::default().score(&samples, &baseline).expect("score");
        let best = scores
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap())
            .unwrap();
        assert_eq!(best.sample_index, 20, "injected outlier should dominate");
        assert!(best.score > 0.9, "3-sigma-plus outlier should be near 1.0: {}", best.score);
    }

    #[test]
    fn test_lambda_maps_three_sigma_to_expected_score() {
        // d = 3 with lambda 0.5 => 1 - exp(-1.5) ~= 0.78 for the distance part
        let d: f64 = 3.0;
        let mapped = 1.0 - (-DEFAULT_DISTANCE_LAMBDA * d).exp();
        assert!((mapped - 0.7769).abs() < 1e-3);
    }

    #[test]
    fn test_dimension_mismatch_is_batch_fatal() {
        let baseline = unit_baseline(4);
        let samples = vec![Sample::new(vec![0.0; 4]), Sample::new(vec![0.0; 3])];
        let err = StatisticalAnomalyScorer::default().score(&samples, &baseline).unwrap_err();
        assert_eq!(err, DetectionError::DimensionMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn test_unrecoverable_covariance_uses_euclidean_fallback() {
        // A zero-dimensional covariance cannot be inverted at all, so the
        // scorer must degrade to the Euclidean path and tag it
        let baseline = BaselineStatistics::new(vec![], vec![]);
        let samples = vec![Sample::new(vec![])];
        let scores = StatisticalAnomalyScorer::default().score(&samples, &baseline).expect("score");
        assert_eq!(scores[0].method, ScoreMethod::EuclideanFallback);
    }

    #[test]
    fn test_empty_batch_is_empty_result() {
        let baseline = unit_baseline(2);
        let scores = StatisticalAnomalyScorer::default().score(&[], &baseline).expect("score");
        assert!(scores.is_empty());
    }
}
