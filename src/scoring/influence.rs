//! Influence Scorer
//!
//! Leave-one-out influence approximation for poisoning candidates: how far
//! each sample sits from the mean of the batch without it. Only
//! high-influence points are reported.

use crate::constants::{COVARIANCE_EPSILON, DEFAULT_INFLUENCE_THRESHOLD};
use crate::ensemble::{AnomalyScore, ScoreMethod};
use crate::error::DetectionError;
use crate::stats::matrix::{euclidean, mahalanobis, regularized_inverse, InverseOutcome};
use crate::stats::{covariance_matrix, feature_means};

use super::Sample;

pub struct InfluenceScorer {
    threshold: f64,
}

impl Default for InfluenceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_INFLUENCE_THRESHOLD)
    }
}

impl InfluenceScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold: threshold.clamp(0.0, 1.0) }
    }

    /// Score the batch against its own leave-one-out means. Fewer than two
    /// samples cannot define influence, so the result is empty, not an
    /// error. Scores below the threshold are dropped.
    pub fn score(&self, samples: &[Sample]) -> Result<Vec<AnomalyScore>, DetectionError> {
        if samples.len() < 2 {
            return Ok(vec![]);
        }
        let dim = samples[0].dimension();
        for sample in samples {
            if sample.dimension() != dim {
                return Err(DetectionError::DimensionMismatch { expected: dim, actual: sample.dimension() });
            }
        }

        let rows: Vec<Vec<f64>> = samples.iter().map(|s| s.features.clone()).collect();
        let mean = feature_means(&rows);
        let covariance = covariance_matrix(&rows, &mean);
        let inverse = match regularized_inverse(&covariance, COVARIANCE_EPSILON) {
            InverseOutcome::Inverted(inv) => Some(inv),
            InverseOutcome::Singular => {
                log::warn!("batch covariance singular, influence falls back to Euclidean");
                None
            }
        };

        let n = samples.len() as f64;
        let distances: Vec<f64> = samples
            .iter()
            .map(|sample| {
                // Mean of the batch with this sample removed
                let loo_mean: Vec<f64> = mean
                    .iter()
                    .zip(sample.features.iter())
                    .map(|(m, x)| (n * m - x) / (n - 1.0))
                    .collect();
                match &inverse {
                    Some(inv) => mahalanobis(&sample.features, &loo_mean, inv),
                    None => euclidean(&sample.features, &loo_mean),
                }
            })
            .collect();

        let max = distances.iter().cloned().fold(0.0f64, f64::max);
        if max < 1e-12 {
            return Ok(vec![]);
        }

        Ok(distances
            .iter()
            .enumerate()
            .map(|(i, d)| (i, d / max))
            .filter(|(_, normalized)| *normalized >= self.threshold)
            .map(|(i, normalized)| AnomalyScore::new(i, normalized, ScoreMethod::Influence))
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fewer_than_two_samples_is_empty_not_error() {
        let scorer = InfluenceScorer::default();
        assert!(scorer.score(&[]).expect("empty batch").is_empty());
        assert!(scorer.score(&[Sample::new(vec![1.0, 2.0])]).expect("single sample").is_empty());
    }

    #[test]
    fn test_poisoned_point_dominates() {
        let mut samples: Vec<Sample> = (0..30)
            .map(|i| Sample::new(vec![(i % 5) as f64 * 0.1, (i % 3) as f64 * 0.1]))
            .collect();
        samples.push(Sample::new(vec![100.0, -100.0]));

        let scores = InfluenceScorer::default().score(&samples).expect("score");
        assert!(!scores.is_empty(), "outlier must be reported");
        let top = scores.iter().max_by(|a, b| a.score.partial_cmp(&b.score).unwrap()).unwrap();
        assert_eq!(top.sample_index, 30);
        assert!((top.score - 1.0).abs() < 1e-12, "batch max normalizes to exactly 1.0");
    }

    #[test]
    fn test_low_influence_points_are_dropped() {
        let mut samples: Vec<Sample> = (0..30)
            .map(|i| Sample::new(vec![(i % 5) as f64 * 0.1, (i % 3) as f64 * 0.1]))
            .collect();
        samples.push(Sample::new(vec![100.0, -100.0]));

        let scores = InfluenceScorer::default().score(&samples).expect("score");
        for s in &scores {
            assert!(s.score >= DEFAULT_INFLUENCE_THRESHOLD, "sub-threshold score reported: {}", s.score);
        }
        assert!(scores.len() < samples.len(), "only high-influence points survive");
    }

    #[test]
    fn test_ragged_batch_rejected() {
        let samples = vec![Sample::new(vec![1.0, 2.0]), Sample::new(vec![1.0])];
        let err = InfluenceScorer::default().score(&samples).unwrap_err();
        assert!(matches!(err, DetectionError::DimensionMismatch { .. }));
    }
}
