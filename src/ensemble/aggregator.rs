//! Ensemble Aggregator
//!
//! Combines named per-sample score maps into one `ThreatAssessment` via
//! weighted voting. This is the single aggregation path for both the
//! poisoning and adversarial pipelines; all scores are defensively clamped
//! to [0,1] here regardless of what upstream computed.

use crate::constants::{BATCH_MAX_WEIGHT, BATCH_MEAN_WEIGHT, DEFAULT_VOTING_THRESHOLD};

use super::types::{AnomalyScore, EnsembleWeights, ScoreMethod, ThreatAssessment, ThreatLevel};

// ============================================================================
// METHOD SCORES
// ============================================================================

/// One detector's output for a batch: either one score per sample, or a
/// single scalar that applies to the whole batch (broadcast on aggregation).
#[derive(Debug, Clone)]
pub struct MethodScores {
    pub method: ScoreMethod,
    pub scores: Vec<f64>,
}

impl MethodScores {
    pub fn per_sample(method: ScoreMethod, scores: Vec<f64>) -> Self {
        Self { method, scores }
    }

    pub fn scalar(method: ScoreMethod, score: f64) -> Self {
        Self { method, scores: vec![score] }
    }

    fn score_at(&self, index: usize) -> f64 {
        if self.scores.len() == 1 {
            self.scores[0]
        } else {
            self.scores.get(index).copied().unwrap_or(0.0)
        }
        .clamp(0.0, 1.0)
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct EnsembleAggregator {
    weights: EnsembleWeights,
    voting_threshold: f64,
}

impl Default for EnsembleAggregator {
    fn default() -> Self {
        Self::new(EnsembleWeights::default(), DEFAULT_VOTING_THRESHOLD)
    }
}

impl EnsembleAggregator {
    pub fn new(weights: EnsembleWeights, voting_threshold: f64) -> Self {
        Self { weights, voting_threshold: voting_threshold.clamp(0.0, 1.0) }
    }

    /// Combine the given score maps into a threat assessment.
    ///
    /// Weights are renormalized over the methods actually present, so a
    /// detector dropping out (e.g. reconstruction collaborator offline)
    /// redistributes its weight instead of deflating every score.
    pub fn aggregate(&self, inputs: &[MethodScores]) -> ThreatAssessment {
        let inputs: Vec<&MethodScores> = inputs.iter().filter(|m| !m.scores.is_empty()).collect();
        if inputs.is_empty() {
            return ThreatAssessment {
                threat_score: 0.0,
                threat_level: ThreatLevel::Low,
                anomalous_samples: vec![],
                contributing_methods: vec![],
            };
        }

        let present: Vec<ScoreMethod> = inputs.iter().map(|m| m.method).collect();
        let weights = self.weights.normalized_over(&present);
        let batch_len = inputs.iter().map(|m| m.scores.len()).max().unwrap_or(0);

        let mut combined = Vec::with_capacity(batch_len);
        for i in 0..batch_len {
            let score: f64 = inputs
                .iter()
                .map(|m| weights.get(&m.method).copied().unwrap_or(0.0) * m.score_at(i))
                .sum();
            combined.push(score.clamp(0.0, 1.0));
        }

        // Dataset-level score: mean alone dilutes a single severe outlier,
        // so blend in the batch max.
        let mean = combined.iter().sum::<f64>() / combined.len() as f64;
        let max = combined.iter().cloned().fold(0.0f64, f64::max);
        let threat_score = (BATCH_MEAN_WEIGHT * mean + BATCH_MAX_WEIGHT * max).clamp(0.0, 1.0);

        let anomalous_samples: Vec<AnomalyScore> = combined
            .iter()
            .enumerate()
            .filter(|(_, &s)| s > self.voting_threshold)
            .map(|(i, &s)| AnomalyScore::new(i, s, ScoreMethod::Ensemble))
            .collect();

        let mut contributing_methods: Vec<ScoreMethod> = weights
            .iter()
            .filter(|(_, &w)| w > 0.0)
            .map(|(m, _)| *m)
            .collect();
        contributing_methods.sort();

        ThreatAssessment {
            threat_score,
            threat_level: ThreatLevel::from_score(threat_score),
            anomalous_samples,
            contributing_methods,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
