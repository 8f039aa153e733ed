//! Sample Scorers
//!
//! One module per detection algorithm. Every scorer is a pure, stateless
//! function of its inputs and safe to call concurrently; shared math lives
//! in `stats`.

pub mod gradient;
pub mod influence;
pub mod isolation;
pub mod reconstruction;
pub mod statistical;

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;
use crate::stats::BaselineStatistics;

pub use gradient::{GradientSignatureAnalyzer, SignatureFamily, SignatureScores};
pub use influence::InfluenceScorer;
pub use isolation::IsolationScorer;
pub use reconstruction::ReconstructionScorer;
pub use statistical::StatisticalAnomalyScorer;

// ============================================================================
// SAMPLE
// ============================================================================

/// A fixed-length numeric feature vector with an optional label.
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub features: Vec<f64>,
    pub label: Option<String>,
}

impl Sample {
    pub fn new(features: Vec<f64>) -> Self {
        Self { features, label: None }
    }

    pub fn labeled(features: Vec<f64>, label: impl Into<String>) -> Self {
        Self { features, label: Some(label.into()) }
    }

    pub fn dimension(&self) -> usize {
        self.features.len()
    }
}

/// The baseline is shared by the whole batch, so one mismatched sample
/// fails the call rather than skewing every other score.
pub(crate) fn check_dimensions(
    samples: &[Sample],
    baseline: &BaselineStatistics,
) -> Result<(), DetectionError> {
    let expected = baseline.dimension();
    for sample in samples {
        if sample.dimension() != expected {
            return Err(DetectionError::DimensionMismatch { expected, actual: sample.dimension() });
        }
    }
    Ok(())
}
