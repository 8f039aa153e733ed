//! Reconstruction Scorer
//!
//! Mean-squared reconstruction error against an external autoencoder
//! collaborator, normalized by a configurable threshold. A missing or
//! failing collaborator yields a neutral score instead of failing the
//! pipeline.

use crate::bridge::Reconstructor;
use crate::constants::{DEFAULT_RECONSTRUCTION_THRESHOLD, NEUTRAL_RECONSTRUCTION_SCORE};
use crate::ensemble::{AnomalyScore, ScoreMethod};

use super::Sample;

pub struct ReconstructionScorer {
    threshold: f64,
}

impl Default for ReconstructionScorer {
    fn default() -> Self {
        Self::new(DEFAULT_RECONSTRUCTION_THRESHOLD)
    }
}

impl ReconstructionScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold: threshold.max(f64::MIN_POSITIVE) }
    }

    /// Score each sample by reconstruction error. `None` collaborator means
    /// every sample scores neutral.
    pub fn score(
        &self,
        samples: &[Sample],
        reconstructor: Option<&dyn Reconstructor>,
    ) -> Vec<AnomalyScore> {
        let Some(model) = reconstructor else {
            if !samples.is_empty() {
                log::warn!("reconstruction model unavailable, scoring batch neutral");
            }
            return samples
                .iter()
                .enumerate()
                .map(|(i, _)| AnomalyScore::new(i, NEUTRAL_RECONSTRUCTION_SCORE, ScoreMethod::Reconstruction))
                .collect();
        };

        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                let score = match model.reconstruct(sample) {
                    Ok(rebuilt) if rebuilt.dimension() == sample.dimension() => {
                        let mse = mean_squared_error(&sample.features, &rebuilt.features);
                        (mse / self.threshold).min(1.0)
                    }
                    Ok(rebuilt) => {
                        log::warn!(
                            "reconstructor returned {} features for a {}-feature sample, scoring neutral",
                            rebuilt.dimension(),
                            sample.dimension()
                        );
                        NEUTRAL_RECONSTRUCTION_SCORE
                    }
                    Err(e) => {
                        log::warn!("reconstruction failed for sample {}: {}", i, e);
                        NEUTRAL_RECONSTRUCTION_SCORE
                    }
                };
                AnomalyScore::new(i, score, ScoreMethod::Reconstruction)
            })
            .collect()
    }
}

fn mean_squared_error(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>() / a.len() as f64
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Reconstructor that returns its input attenuated toward zero.
    struct Damping(f64);

    impl Reconstructor for Damping {
        fn reconstruct(&self, sample: &Sample) -> Result<Sample, String> {
            Ok(Sample::new(sample.features.iter().map(|v| v * self.0).collect()))
        }
    }

    struct Broken;

    impl Reconstructor for Broken {
        fn reconstruct(&self, _sample: &Sample) -> Result<Sample, String> {
            Err("model endpoint offline".to_string())
        }
    }

    #[test]
    fn test_missing_collaborator_scores_neutral() {
        let samples = vec![Sample::new(vec![1.0, 2.0]), Sample::new(vec![3.0, 4.0])];
        let scores = ReconstructionScorer::default().score(&samples, None);
        assert_eq!(scores.len(), 2);
        for s in scores {
            assert!((s.score - NEUTRAL_RECONSTRUCTION_SCORE).abs() < 1e-12);
        }
    }

    #[test]
    fn test_failing_collaborator_scores_neutral() {
        let samples = vec![Sample::new(vec![1.0, 2.0])];
        let scores = ReconstructionScorer::default().score(&samples, Some(&Broken));
        assert!((scores[0].score - NEUTRAL_RECONSTRUCTION_SCORE).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_reconstruction_scores_zero() {
        let samples = vec![Sample::new(vec![0.3, -0.7, 1.1])];
        let scores = ReconstructionScorer::default().score(&samples, Some(&Damping(1.0)));
        assert!(scores[0].score < 1e-12);
    }

    #[test]
    fn test_large_error_clamps_at_one() {
        let samples = vec![Sample::new(vec![10.0, -10.0])];
        // Damping to zero leaves mse = 100, far over the 0.15 threshold
        let scores = ReconstructionScorer::default().score(&samples, Some(&Damping(0.0)));
        assert!((scores[0].score - 1.0).abs() < 1e-12, "score must clamp at 1.0");
    }

    #[test]
    fn test_error_scales_with_threshold() {
        let samples = vec![Sample::new(vec![1.0, 1.0])];
        // mse of damping 0.9 is (0.1)^2 = 0.01
        let strict = ReconstructionScorer::new(0.01).score(&samples, Some(&Damping(0.9)));
        let lax = ReconstructionScorer::new(1.0).score(&samples, Some(&Damping(0.9)));
        assert!(strict[0].score > lax[0].score);
    }
}
