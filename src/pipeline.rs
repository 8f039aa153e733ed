//! Detection Pipelines
//!
//! `DetectionEngine` wires the scorers to the ensemble aggregator: the
//! poisoning pipeline scores dataset batches, the adversarial pipeline
//! scores single inference inputs. Stages run sequentially in a fixed
//! order (statistical, then pipeline-specific scorers, then aggregation);
//! every pipeline shares the one canonical implementation of each
//! algorithm.

use crate::bridge::Reconstructor;
use crate::config::DetectionConfig;
use crate::ensemble::{
    EnsembleAggregator, MethodScores, ScoreMethod, ThreatAssessment,
};
use crate::error::DetectionError;
use crate::scoring::{
    GradientSignatureAnalyzer, InfluenceScorer, IsolationScorer, ReconstructionScorer, Sample,
    SignatureScores, StatisticalAnomalyScorer,
};
use crate::stats::BaselineStatistics;
use crate::theft::{QueryRecord, TheftAssessment, TheftPatternAnalyzer};

// ============================================================================
// ADVERSARIAL REPORT
// ============================================================================

/// Adversarial verdict for a single input: the per-family signature scores
/// plus the aggregated assessment.
#[derive(Debug, Clone)]
pub struct AdversarialAssessment {
    pub signatures: SignatureScores,
    pub assessment: ThreatAssessment,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct DetectionEngine {
    config: DetectionConfig,
    statistical: StatisticalAnomalyScorer,
    isolation: IsolationScorer,
    reconstruction: ReconstructionScorer,
    influence: InfluenceScorer,
    gradient: GradientSignatureAnalyzer,
    aggregator: EnsembleAggregator,
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(DetectionConfig::default()).expect("default config is valid")
    }
}

impl DetectionEngine {
    pub fn new(config: DetectionConfig) -> Result<Self, DetectionError> {
        config.validate()?;
        Ok(Self {
            statistical: StatisticalAnomalyScorer::new(config.distance_lambda),
            isolation: IsolationScorer::new(config.isolation_trees),
            reconstruction: ReconstructionScorer::new(config.reconstruction_threshold),
            influence: InfluenceScorer::new(config.influence_threshold),
            gradient: GradientSignatureAnalyzer::default(),
            aggregator: EnsembleAggregator::new(
                config.ensemble_weights.clone(),
                config.voting_threshold,
            ),
            config,
        })
    }

    /// Deterministic isolation scoring for tests and reproducible runs.
    pub fn with_isolation_seed(mut self, seed: u64) -> Self {
        self.isolation = IsolationScorer::with_seed(self.config.isolation_trees, seed);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // POISONING PIPELINE
    // ------------------------------------------------------------------

    /// Score a dataset batch for poisoning. Without a baseline the
    /// statistical stage falls back to unsupervised isolation scoring.
    pub fn detect_poisoning(
        &self,
        samples: &[Sample],
        baseline: Option<&BaselineStatistics>,
        reconstructor: Option<&dyn Reconstructor>,
    ) -> Result<ThreatAssessment, DetectionError> {
        if samples.is_empty() {
            return Ok(self.aggregator.aggregate(&[]));
        }

        let mut inputs = Vec::new();

        match baseline {
            Some(baseline) => {
                let scores = self.statistical.score(samples, baseline)?;
                // The fallback method tag survives into the ensemble
                let method = scores.first().map(|s| s.method).unwrap_or(ScoreMethod::Statistical);
                inputs.push(MethodScores::per_sample(
                    method,
                    scores.iter().map(|s| s.score).collect(),
                ));
                inputs.push(MethodScores::per_sample(
                    ScoreMethod::Isolation,
                    self.isolation.score(samples).iter().map(|s| s.score).collect(),
                ));
            }
            None => {
                log::info!("no baseline supplied, scoring batch with isolation only");
                inputs.push(MethodScores::per_sample(
                    ScoreMethod::Isolation,
                    self.isolation.score(samples).iter().map(|s| s.score).collect(),
                ));
            }
        }

        // Influence reports only high scores; unreported samples score 0
        let mut influence_scores = vec![0.0; samples.len()];
        for entry in self.influence.score(samples)? {
            influence_scores[entry.sample_index] = entry.score;
        }
        inputs.push(MethodScores::per_sample(ScoreMethod::Influence, influence_scores));

        if reconstructor.is_some() || self.reconstruction_weighted() {
            inputs.push(MethodScores::per_sample(
                ScoreMethod::Reconstruction,
                self.reconstruction
                    .score(samples, reconstructor)
                    .iter()
                    .map(|s| s.score)
                    .collect(),
            ));
        }

        let assessment = self.aggregator.aggregate(&inputs);

        let flagged_fraction = assessment.anomalous_samples.len() as f64 / samples.len() as f64;
        if flagged_fraction > self.config.contamination {
            log::warn!(
                "{:.1}% of the batch flagged anomalous, above the {:.1}% contamination expectation",
                flagged_fraction * 100.0,
                self.config.contamination * 100.0
            );
        }

        Ok(assessment)
    }

    // ------------------------------------------------------------------
    // ADVERSARIAL PIPELINE
    // ------------------------------------------------------------------

    /// Score a single inference input for adversarial perturbation
    /// signatures.
    pub fn detect_adversarial(
        &self,
        sample: &Sample,
        reconstructor: Option<&dyn Reconstructor>,
    ) -> AdversarialAssessment {
        let signatures = self.gradient.analyze(&sample.features);

        let mut inputs = vec![MethodScores::scalar(
            ScoreMethod::GradientSignature,
            signatures.max_score(),
        )];
        if let Some(model) = reconstructor {
            let scores = self.reconstruction.score(std::slice::from_ref(sample), Some(model));
            inputs.push(MethodScores::scalar(ScoreMethod::Reconstruction, scores[0].score));
        }

        let assessment = self.aggregator.aggregate(&inputs);
        AdversarialAssessment { signatures, assessment }
    }

    // ------------------------------------------------------------------
    // THEFT PIPELINE
    // ------------------------------------------------------------------

    /// Score a query window for extraction patterns.
    pub fn analyze_theft(
        &self,
        records: &[QueryRecord],
        window_secs: f64,
        response_correlation: Option<f64>,
    ) -> TheftAssessment {
        TheftPatternAnalyzer::default().analyze(records, window_secs, response_correlation)
    }

    fn reconstruction_weighted(&self) -> bool {
        self.config
            .ensemble_weights
            .0
            .get(&ScoreMethod::Reconstruction)
            .map(|w| *w > 0.0)
            .unwrap_or(false)
    }
}

// ============================================================================
// TESTS
// ============================================================================
