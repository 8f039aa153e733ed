//! Detection Configuration
//!
//! Runtime-overridable thresholds and weights. Every numeric knob in the
//! detection pipelines defaults to the value in `constants.rs` and can be
//! replaced without code changes by loading a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    DEFAULT_DISTANCE_LAMBDA, DEFAULT_DRIFT_THRESHOLD, DEFAULT_INFLUENCE_THRESHOLD,
    DEFAULT_ISOLATION_TREES, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RECONSTRUCTION_THRESHOLD,
    DEFAULT_VOTING_THRESHOLD, THEFT_ALERT_THRESHOLD,
};
use crate::ensemble::EnsembleWeights;
use crate::error::DetectionError;

/// Configurable detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Decay rate mapping distances into [0,1].
    pub distance_lambda: f64,
    /// Reconstruction error that saturates the reconstruction score.
    pub reconstruction_threshold: f64,
    /// Influence scores below this are not reported.
    pub influence_threshold: f64,
    /// Trees in the isolation ensemble.
    pub isolation_trees: usize,
    /// Combined score a sample must exceed to be reported anomalous.
    pub voting_threshold: f64,
    /// Expected anomalous fraction of a clean dataset; a batch flagging
    /// more than this is logged as likely contaminated.
    pub contamination: f64,
    /// Drift component threshold for `has_drift`.
    pub drift_threshold: f64,
    /// Monitoring poll interval (seconds).
    pub poll_interval_secs: u64,
    /// Theft probability above which an alert is dispatched.
    pub theft_alert_threshold: f64,
    /// Method weights for ensemble aggregation.
    pub ensemble_weights: EnsembleWeights,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            distance_lambda: DEFAULT_DISTANCE_LAMBDA,
            reconstruction_threshold: DEFAULT_RECONSTRUCTION_THRESHOLD,
            influence_threshold: DEFAULT_INFLUENCE_THRESHOLD,
            isolation_trees: DEFAULT_ISOLATION_TREES,
            voting_threshold: DEFAULT_VOTING_THRESHOLD,
            contamination: 0.1,
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            theft_alert_threshold: THEFT_ALERT_THRESHOLD,
            ensemble_weights: EnsembleWeights::default(),
        }
    }
}

impl DetectionConfig {
    /// High sensitivity - lower thresholds, more findings.
    pub fn high_sensitivity() -> Self {
        Self {
            voting_threshold: 0.35,
            influence_threshold: 0.5,
            drift_threshold: 0.1,
            theft_alert_threshold: 0.5,
            ..Default::default()
        }
    }

    /// Low sensitivity - higher thresholds, fewer findings.
    pub fn low_sensitivity() -> Self {
        Self {
            voting_threshold: 0.65,
            influence_threshold: 0.8,
            drift_threshold: 0.25,
            theft_alert_threshold: 0.85,
            ..Default::default()
        }
    }

    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, DetectionError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DetectionError::InvalidConfig(format!("read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| DetectionError::InvalidConfig(format!("parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside their documented ranges.
    pub fn validate(&self) -> Result<(), DetectionError> {
        fn unit_range(name: &str, v: f64) -> Result<(), DetectionError> {
            if !(0.0..=1.0).contains(&v) {
                return Err(DetectionError::InvalidConfig(format!("{} must be in [0,1], got {}", name, v)));
            }
            Ok(())
        }

        unit_range("voting_threshold", self.voting_threshold)?;
        unit_range("contamination", self.contamination)?;
        unit_range("drift_threshold", self.drift_threshold)?;
        unit_range("influence_threshold", self.influence_threshold)?;
        unit_range("theft_alert_threshold", self.theft_alert_threshold)?;

        if self.distance_lambda <= 0.0 {
            return Err(DetectionError::InvalidConfig(format!(
                "distance_lambda must be positive, got {}",
                self.distance_lambda
            )));
        }
        if self.reconstruction_threshold <= 0.0 {
            return Err(DetectionError::InvalidConfig(format!(
                "reconstruction_threshold must be positive, got {}",
                self.reconstruction_threshold
            )));
        }
        if self.isolation_trees == 0 {
            return Err(DetectionError::InvalidConfig("isolation_trees must be at least 1".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(DetectionError::InvalidConfig("poll_interval_secs must be at least 1".to_string()));
        }
        for (method, weight) in &self.ensemble_weights.0 {
            if *weight < 0.0 {
                return Err(DetectionError::InvalidConfig(format!(
                    "ensemble weight for {} must be non-negative, got {}",
                    method, weight
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
