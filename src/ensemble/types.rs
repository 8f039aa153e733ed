//! Ensemble Types
//!
//! Core types for detection scoring and threat assessment.
//! No logic here beyond invariant-preserving constructors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::rules::{THREAT_CRITICAL_MIN, THREAT_HIGH_MIN, THREAT_MEDIUM_MIN};

// ============================================================================
// SCORE METHOD
// ============================================================================

/// Which detector produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreMethod {
    Statistical,
    /// Mahalanobis degraded to Euclidean because the covariance stayed
    /// singular after regularization.
    EuclideanFallback,
    Isolation,
    Reconstruction,
    Influence,
    GradientSignature,
    Ensemble,
}

impl ScoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMethod::Statistical => "statistical",
            ScoreMethod::EuclideanFallback => "euclidean_fallback",
            ScoreMethod::Isolation => "isolation",
            ScoreMethod::Reconstruction => "reconstruction",
            ScoreMethod::Influence => "influence",
            ScoreMethod::GradientSignature => "gradient_signature",
            ScoreMethod::Ensemble => "ensemble",
        }
    }
}

impl std::fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// THREAT LEVEL
// ============================================================================

/// Threat classification levels, ordered Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Map a combined score in [0,1] to a level. Monotonic: a higher score
    /// never yields a lower level.
    pub fn from_score(score: f64) -> Self {
        if score >= THREAT_CRITICAL_MIN {
            ThreatLevel::Critical
        } else if score >= THREAT_HIGH_MIN {
            ThreatLevel::High
        } else if score >= THREAT_MEDIUM_MIN {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ANOMALY SCORE
// ============================================================================

/// Per-sample anomaly score in [0,1]; higher = more anomalous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub sample_index: usize,
    pub score: f64,
    pub method: ScoreMethod,
}

impl AnomalyScore {
    pub fn new(sample_index: usize, score: f64, method: ScoreMethod) -> Self {
        Self { sample_index, score: score.clamp(0.0, 1.0), method }
    }
}

// ============================================================================
// ENSEMBLE WEIGHTS
// ============================================================================

/// Method-to-weight mapping. Weights are renormalized to sum 1.0 before
/// use, so callers may supply any non-negative values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleWeights(pub HashMap<ScoreMethod, f64>);

impl Default for EnsembleWeights {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(ScoreMethod::Statistical, 0.4);
        weights.insert(ScoreMethod::Isolation, 0.3);
        weights.insert(ScoreMethod::Influence, 0.3);
        Self(weights)
    }
}

impl EnsembleWeights {
    /// Uniform weights over the given methods.
    pub fn uniform(methods: &[ScoreMethod]) -> Self {
        let w = if methods.is_empty() { 0.0 } else { 1.0 / methods.len() as f64 };
        Self(methods.iter().map(|m| (*m, w)).collect())
    }

    /// Configured weight for a method. The Euclidean fallback inherits the
    /// statistical weight, since it is the same detector in degraded mode.
    fn weight_for(&self, method: ScoreMethod) -> f64 {
        match self.0.get(&method) {
            Some(w) => *w,
            None if method == ScoreMethod::EuclideanFallback => {
                self.0.get(&ScoreMethod::Statistical).copied().unwrap_or(0.0)
            }
            None => 0.0,
        }
    }

    /// Weight for a method, restricted to `present`, renormalized so the
    /// restricted weights sum to 1.0. Methods absent from the map get the
    /// uniform share when nothing else is weighted.
    pub fn normalized_over(&self, present: &[ScoreMethod]) -> HashMap<ScoreMethod, f64> {
        let mut restricted: HashMap<ScoreMethod, f64> = present
            .iter()
            .map(|m| (*m, self.weight_for(*m).max(0.0)))
            .collect();

        let sum: f64 = restricted.values().sum();
        if sum < 1e-9 {
            // Nothing weighted: fall back to uniform over present methods
            let w = if present.is_empty() { 0.0 } else { 1.0 / present.len() as f64 };
            for v in restricted.values_mut() {
                *v = w;
            }
        } else if (sum - 1.0).abs() > 1e-6 {
            for v in restricted.values_mut() {
                *v /= sum;
            }
        }
        restricted
    }
}

// ============================================================================
// THREAT ASSESSMENT
// ============================================================================

/// Final verdict for one detection call. Created fresh per call; never
/// mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub threat_score: f64,
    pub threat_level: ThreatLevel,
    pub anomalous_samples: Vec<AnomalyScore>,
    pub contributing_methods: Vec<ScoreMethod>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one_after_normalization() {
        let mut raw = HashMap::new();
        raw.insert(ScoreMethod::Statistical, 3.0);
        raw.insert(ScoreMethod::Isolation, 1.0);
        let weights = EnsembleWeights(raw);

        let normalized =
            weights.normalized_over(&[ScoreMethod::Statistical, ScoreMethod::Isolation]);
        let sum: f64 = normalized.values().sum();
        assert!((sum - 1.0).abs() < 1e-6, "normalized weights must sum to 1: {}", sum);
        assert!((normalized[&ScoreMethod::Statistical] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_unweighted_methods_share_uniformly() {
        let weights = EnsembleWeights(HashMap::new());
        let normalized =
            weights.normalized_over(&[ScoreMethod::Reconstruction, ScoreMethod::Influence]);
        assert!((normalized[&ScoreMethod::Reconstruction] - 0.5).abs() < 1e-9);
        assert!((normalized[&ScoreMethod::Influence] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_anomaly_score_clamps_on_construction() {
        assert_eq!(AnomalyScore::new(0, 3.5, ScoreMethod::Ensemble).score, 1.0);
        assert_eq!(AnomalyScore::new(0, -0.5, ScoreMethod::Ensemble).score, 0.0);
    }
}
