//! Model Fingerprinter
//!
//! Deterministic SHA-256 digests over a snapshot's weights, metrics and
//! output distribution. Layer names are hashed in lexicographic order and
//! weights are rounded to a fixed precision first, so re-serialization
//! noise and map insertion order never change the fingerprint.

use chrono::Utc;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::constants::FINGERPRINT_ROUNDING_DIGITS;

use super::types::{ModelFingerprint, ModelSnapshot};

// ============================================================================
// HASHING
// ============================================================================

fn round_weight(value: f64) -> f64 {
    let scale = 10f64.powi(FINGERPRINT_ROUNDING_DIGITS as i32);
    let rounded = (value * scale).round() / scale;
    // Collapse -0.0 so it hashes like 0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn hash_layer(weights: &[f64]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for w in weights {
        hasher.update(round_weight(*w).to_be_bytes());
    }
    hasher.finalize().into()
}

/// Compute per-layer and overall hashes for a snapshot.
pub fn fingerprint(snapshot: &ModelSnapshot) -> ModelFingerprint {
    // BTreeMap iteration is already lexicographic by layer name
    let per_layer_hash: BTreeMap<String, [u8; 32]> = snapshot
        .layer_weights
        .iter()
        .map(|(name, weights)| (name.clone(), hash_layer(weights)))
        .collect();

    let mut hasher = Sha256::new();
    for (name, layer_hash) in &per_layer_hash {
        hasher.update(name.as_bytes());
        hasher.update(layer_hash);
    }
    match snapshot.accuracy {
        Some(acc) => hasher.update(round_weight(acc).to_be_bytes()),
        None => hasher.update(b"acc:none"),
    }
    match snapshot.loss {
        Some(loss) => hasher.update(round_weight(loss).to_be_bytes()),
        None => hasher.update(b"loss:none"),
    }
    for (label, p) in &snapshot.output_distribution {
        hasher.update(label.as_bytes());
        hasher.update(round_weight(*p).to_be_bytes());
    }

    ModelFingerprint {
        model_id: snapshot.model_id.clone(),
        overall_hash: hasher.finalize().into(),
        per_layer_hash,
        created_at: Utc::now(),
        active: true,
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// In-process fingerprint history per model. Generating a new fingerprint
/// supersedes the previous active one; superseded entries stay in the
/// history until the process ends.
#[derive(Default)]
pub struct FingerprintRegistry {
    by_model: RwLock<HashMap<String, Vec<ModelFingerprint>>>,
}

impl FingerprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint the snapshot, deactivate the prior fingerprint for this
    /// model, and record the new one as active.
    pub fn generate(&self, snapshot: &ModelSnapshot) -> ModelFingerprint {
        let print = fingerprint(snapshot);
        let mut by_model = self.by_model.write();
        let history = by_model.entry(print.model_id.clone()).or_default();
        if let Some(previous) = history.iter_mut().find(|f| f.active) {
            previous.active = false;
        }
        history.push(print.clone());
        log::debug!("fingerprint {} recorded for model '{}'", print.overall_hash_hex(), print.model_id);
        print
    }

    pub fn active(&self, model_id: &str) -> Option<ModelFingerprint> {
        self.by_model
            .read()
            .get(model_id)
            .and_then(|history| history.iter().find(|f| f.active).cloned())
    }

    pub fn history(&self, model_id: &str) -> Vec<ModelFingerprint> {
        self.by_model.read().get(model_id).cloned().unwrap_or_default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ModelSnapshot {
        let mut dist = BTreeMap::new();
        dist.insert("cat".to_string(), 0.6);
        dist.insert("dog".to_string(), 0.4);
        ModelSnapshot::new("resnet-50")
            .with_layer("conv1", vec![0.1, 0.2, 0.3])
            .with_layer("output", vec![1.5, -2.5])
            .with_output_distribution(dist)
            .with_metrics(Some(0.93), Some(0.21))
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint(&snapshot());
        let b = fingerprint(&snapshot());
        assert_eq!(a.overall_hash, b.overall_hash);
        assert_eq!(a.per_layer_hash, b.per_layer_hash);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        // Insert layers in reverse order; BTreeMap sorts, hash must match
        let reversed = ModelSnapshot::new("resnet-50")
            .with_layer("output", vec![1.5, -2.5])
            .with_layer("conv1", vec![0.1, 0.2, 0.3])
            .with_output_distribution(snapshot().output_distribution)
            .with_metrics(Some(0.93), Some(0.21));
        assert_eq!(fingerprint(&snapshot()).overall_hash, fingerprint(&reversed).overall_hash);
    }

    #[test]
    fn test_sub_rounding_noise_is_tolerated() {
        let mut noisy = snapshot();
        noisy.layer_weights.get_mut("conv1").unwrap()[0] = 0.1 + 1e-9;
        assert_eq!(
            fingerprint(&snapshot()).overall_hash,
            fingerprint(&noisy).overall_hash,
            "noise below 6 decimals must not change the hash"
        );
    }

    #[test]
    fn test_single_weight_change_changes_hash() {
        let mut tampered = snapshot();
        tampered.layer_weights.get_mut("conv1").unwrap()[0] = 0.1001;
        assert_ne!(fingerprint(&snapshot()).overall_hash, fingerprint(&tampered).overall_hash);
        assert_ne!(
            fingerprint(&snapshot()).per_layer_hash["conv1"],
            fingerprint(&tampered).per_layer_hash["conv1"]
        );
        // Untouched layers keep their hash
        assert_eq!(
            fingerprint(&snapshot()).per_layer_hash["output"],
            fingerprint(&tampered).per_layer_hash["output"]
        );
    }

    #[test]
    fn test_metadata_changes_hash() {
        let mut changed = snapshot();
        changed.accuracy = Some(0.80);
        assert_ne!(fingerprint(&snapshot()).overall_hash, fingerprint(&changed).overall_hash);
    }

    #[test]
    fn test_registry_supersedes_not_deletes() {
        let registry = FingerprintRegistry::new();
        let first = registry.generate(&snapshot());
        assert!(first.active);

        let mut updated = snapshot();
        updated.layer_weights.get_mut("conv1").unwrap()[1] = 9.0;
        let second = registry.generate(&updated);

        let active = registry.active("resnet-50").expect("active fingerprint");
        assert_eq!(active.overall_hash, second.overall_hash);

        let history = registry.history("resnet-50");
        assert_eq!(history.len(), 2, "superseded fingerprints are kept");
        assert!(!history[0].active, "old fingerprint marked inactive");
        assert!(history[1].active);
    }
}
