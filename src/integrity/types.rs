//! Integrity Types
//!
//! Snapshot, fingerprint and drift data structures. The snapshot is
//! supplied by the model-serving collaborator and never mutated here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// MODEL SNAPSHOT
// ============================================================================

/// Point-in-time view of a deployed model. BTreeMaps keep layer and label
/// iteration in lexicographic order, which the fingerprinter relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub model_id: String,
    pub layer_weights: BTreeMap<String, Vec<f64>>,
    pub output_distribution: BTreeMap<String, f64>,
    pub accuracy: Option<f64>,
    pub loss: Option<f64>,
}

impl ModelSnapshot {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            layer_weights: BTreeMap::new(),
            output_distribution: BTreeMap::new(),
            accuracy: None,
            loss: None,
        }
    }

    pub fn with_layer(mut self, name: impl Into<String>, weights: Vec<f64>) -> Self {
        self.layer_weights.insert(name.into(), weights);
        self
    }

    pub fn with_output_distribution(mut self, dist: BTreeMap<String, f64>) -> Self {
        self.output_distribution = dist;
        self
    }

    pub fn with_metrics(mut self, accuracy: Option<f64>, loss: Option<f64>) -> Self {
        self.accuracy = accuracy;
        self.loss = loss;
        self
    }
}

// ============================================================================
// MODEL FINGERPRINT
// ============================================================================

/// Deterministic digest of a snapshot. A new fingerprint for the same
/// model supersedes the previous one (marked inactive); nothing is deleted
/// here - durable history is the persistence collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFingerprint {
    pub model_id: String,
    pub overall_hash: [u8; 32],
    pub per_layer_hash: BTreeMap<String, [u8; 32]>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl ModelFingerprint {
    pub fn overall_hash_hex(&self) -> String {
        hex::encode(self.overall_hash)
    }
}

// ============================================================================
// DRIFT RESULT
// ============================================================================

/// Distributional drift between two snapshots of the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftResult {
    pub has_drift: bool,
    pub overall_drift_score: f64,
    pub per_layer_drift: BTreeMap<String, f64>,
    pub output_distribution_drift: f64,
    pub performance_drift: f64,
}

// ============================================================================
// INTEGRITY RESULT
// ============================================================================

/// Outcome of one monitoring poll: drift against the session baseline plus
/// whether the fingerprint moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub model_id: String,
    pub drift: DriftResult,
    pub fingerprint_changed: bool,
    pub checked_at: DateTime<Utc>,
}

impl IntegrityResult {
    /// True when anything about the model moved enough to notify.
    pub fn is_violation(&self) -> bool {
        self.drift.has_drift || self.fingerprint_changed
    }
}
