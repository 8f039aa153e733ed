//! Drift Detector
//!
//! Distributional drift between a current and a baseline snapshot.
//! Per shared layer: `0.4*PSI + 0.3*Wasserstein_proxy + 0.3*KS_proxy`,
//! clamped to [0,1]. A layer whose lengths differ scores maximum drift
//! rather than erroring. Output-distribution drift uses Jensen-Shannon
//! distance; layers named `output*` get double weight in the overall
//! average.

use std::collections::BTreeMap;

use crate::constants::{
    DEFAULT_DRIFT_THRESHOLD, DRIFT_KS_WEIGHT, DRIFT_PSI_WEIGHT, DRIFT_WASSERSTEIN_WEIGHT, PSI_BINS,
};
use crate::stats::jensen_shannon_distance;

use super::types::{DriftResult, ModelSnapshot};

const FLOOR: f64 = 1e-10;

pub struct DriftDetector {
    threshold: f64,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_THRESHOLD)
    }
}

impl DriftDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold: threshold.clamp(0.0, 1.0) }
    }

    pub fn detect(&self, current: &ModelSnapshot, baseline: &ModelSnapshot) -> DriftResult {
        let mut per_layer_drift = BTreeMap::new();

        for (name, baseline_weights) in &baseline.layer_weights {
            let Some(current_weights) = current.layer_weights.get(name) else {
                continue;
            };
            let score = if current_weights.len() != baseline_weights.len() {
                log::warn!(
                    "layer '{}' length changed {} -> {}, treating as maximum drift",
                    name,
                    baseline_weights.len(),
                    current_weights.len()
                );
                1.0
            } else {
                layer_drift(current_weights, baseline_weights)
            };
            per_layer_drift.insert(name.clone(), score);
        }

        let output_distribution_drift = distribution_drift(
            &current.output_distribution,
            &baseline.output_distribution,
        );
        let performance_drift = performance_drift(current, baseline);

        let overall_drift_score = if per_layer_drift.is_empty() {
            output_distribution_drift.max(performance_drift)
        } else {
            // Output-adjacent layers reflect behavior change most directly
            let mut weighted = 0.0;
            let mut total = 0.0;
            for (name, score) in &per_layer_drift {
                let weight = if name.to_lowercase().starts_with("output") { 2.0 } else { 1.0 };
                weighted += weight * score;
                total += weight;
            }
            (weighted / total).clamp(0.0, 1.0)
        };

        let has_drift = per_layer_drift.values().any(|s| *s > self.threshold)
            || output_distribution_drift > self.threshold
            || performance_drift > self.threshold;

        if has_drift {
            log::warn!(
                "drift detected for model '{}': overall {:.3}, output-dist {:.3}, perf {:.3}",
                current.model_id,
                overall_drift_score,
                output_distribution_drift,
                performance_drift
            );
        }

        DriftResult {
            has_drift,
            overall_drift_score,
            per_layer_drift,
            output_distribution_drift,
            performance_drift,
        }
    }
}

// ============================================================================
// LAYER DRIFT MEASURES
// ============================================================================

fn layer_drift(current: &[f64], baseline: &[f64]) -> f64 {
    if current.is_empty() {
        return 0.0;
    }
    let psi = psi(current, baseline).min(1.0);
    let wasserstein = wasserstein_proxy(current, baseline);
    let ks = ks_proxy(current, baseline);
    (DRIFT_PSI_WEIGHT * psi + DRIFT_WASSERSTEIN_WEIGHT * wasserstein + DRIFT_KS_WEIGHT * ks)
        .clamp(0.0, 1.0)
}

/// Population Stability Index over a shared histogram of both samples.
fn psi(current: &[f64], baseline: &[f64]) -> f64 {
    let (current_hist, baseline_hist) = shared_histograms(current, baseline);
    current_hist
        .iter()
        .zip(baseline_hist.iter())
        .map(|(&c, &b)| {
            let c = c.max(FLOOR);
            let b = b.max(FLOOR);
            (c - b) * (c / b).ln()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Sup distance between the two binned CDFs.
fn ks_proxy(current: &[f64], baseline: &[f64]) -> f64 {
    let (current_hist, baseline_hist) = shared_histograms(current, baseline);
    let mut cdf_c = 0.0;
    let mut cdf_b = 0.0;
    let mut sup: f64 = 0.0;
    for (c, b) in current_hist.iter().zip(baseline_hist.iter()) {
        cdf_c += c;
        cdf_b += b;
        sup = sup.max((cdf_c - cdf_b).abs());
    }
    sup.clamp(0.0, 1.0)
}

/// Mean quantile displacement normalized by the combined value range.
/// Equal-length inputs pair rank-for-rank after sorting.
fn wasserstein_proxy(current: &[f64], baseline: &[f64]) -> f64 {
    let mut c = current.to_vec();
    let mut b = baseline.to_vec();
    c.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

    let lo = c[0].min(b[0]);
    let hi = c[c.len() - 1].max(b[b.len() - 1]);
    let range = hi - lo;
    if range < FLOOR {
        return 0.0;
    }

    let displacement =
        c.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum::<f64>() / c.len() as f64;
    (displacement / range).clamp(0.0, 1.0)
}

/// Normalized histograms of both samples over their combined range.
fn shared_histograms(current: &[f64], baseline: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let lo = current
        .iter()
        .chain(baseline.iter())
        .cloned()
        .fold(f64::MAX, f64::min);
    let hi = current
        .iter()
        .chain(baseline.iter())
        .cloned()
        .fold(f64::MIN, f64::max);

    let bin = |values: &[f64]| -> Vec<f64> {
        let mut hist = vec![0.0; PSI_BINS];
        if values.is_empty() {
            return hist;
        }
        let width = ((hi - lo) / PSI_BINS as f64).max(FLOOR);
        for v in values {
            let idx = (((v - lo) / width) as usize).min(PSI_BINS - 1);
            hist[idx] += 1.0;
        }
        for h in &mut hist {
            *h /= values.len() as f64;
        }
        hist
    };

    (bin(current), bin(baseline))
}

// ============================================================================
// OUTPUT & PERFORMANCE DRIFT
// ============================================================================

/// Jensen-Shannon distance over the union of output labels.
fn distribution_drift(current: &BTreeMap<String, f64>, baseline: &BTreeMap<String, f64>) -> f64 {
    if current.is_empty() && baseline.is_empty() {
        return 0.0;
    }
    let labels: Vec<&String> = current.keys().chain(baseline.keys()).collect();
    let mut seen = std::collections::BTreeSet::new();
    let labels: Vec<&String> = labels.into_iter().filter(|l| seen.insert(l.as_str())).collect();

    let p: Vec<f64> = labels.iter().map(|l| current.get(*l).copied().unwrap_or(0.0)).collect();
    let q: Vec<f64> = labels.iter().map(|l| baseline.get(*l).copied().unwrap_or(0.0)).collect();
    jensen_shannon_distance(&p, &q).clamp(0.0, 1.0)
}

/// Relative movement in accuracy/loss, when both snapshots report them.
fn performance_drift(current: &ModelSnapshot, baseline: &ModelSnapshot) -> f64 {
    let accuracy_drift = match (current.accuracy, baseline.accuracy) {
        (Some(c), Some(b)) => (c - b).abs(),
        _ => 0.0,
    };
    let loss_drift = match (current.loss, baseline.loss) {
        (Some(c), Some(b)) => ((c - b).abs() / b.abs().max(FLOOR)).min(1.0),
        _ => 0.0,
    };
    accuracy_drift.max(loss_drift).clamp(0.0, 1.0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_snapshot(scale: f64) -> ModelSnapshot {
        let ramp: Vec<f64> = (0..64).map(|i| scale * (i as f64 / 32.0 - 1.0)).collect();
        let steady: Vec<f64> = (0..64).map(|i| (i as f64 / 32.0 - 1.0)).collect();
        let mut dist = BTreeMap::new();
        dist.insert("cat".to_string(), 0.5);
        dist.insert("dog".to_string(), 0.5);
        ModelSnapshot::new("m1")
            .with_layer("conv1", steady.clone())
            .with_layer("conv2", steady)
            .with_layer("output_head", ramp)
            .with_output_distribution(dist)
    }

    #[test]
    fn test_identical_snapshots_have_no_drift() {
        let snap = ramp_snapshot(1.0);
        let result = DriftDetector::default().detect(&snap, &snap);
        assert!(!result.has_drift);
        assert!(result.overall_drift_score < 1e-9, "overall: {}", result.overall_drift_score);
        for (layer, score) in &result.per_layer_drift {
            assert!(*score < 1e-9, "layer {} drifted: {}", layer, score);
        }
        assert!(result.output_distribution_drift < 1e-9);
    }

    #[test]
    fn test_scaled_layer_drifts_others_do_not() {
        let baseline = ramp_snapshot(1.0);
        let current = ramp_snapshot(2.0);
        let result = DriftDetector::default().detect(&current, &baseline);

        assert!(
            result.per_layer_drift["output_head"] > DEFAULT_DRIFT_THRESHOLD,
            "2x scaled layer must cross the drift threshold: {}",
            result.per_layer_drift["output_head"]
        );
        assert!(result.per_layer_drift["conv1"] < 1e-9, "unchanged layer must not drift");
        assert!(result.per_layer_drift["conv2"] < 1e-9);
        assert!(result.has_drift);
    }

    #[test]
    fn test_length_mismatch_is_maximum_drift() {
        let baseline = ModelSnapshot::new("m1").with_layer("fc", vec![1.0, 2.0, 3.0]);
        let current = ModelSnapshot::new("m1").with_layer("fc", vec![1.0, 2.0]);
        let result = DriftDetector::default().detect(&current, &baseline);
        assert_eq!(result.per_layer_drift["fc"], 1.0);
        assert!(result.has_drift);
    }

    #[test]
    fn test_output_layers_weigh_double() {
        let steady: Vec<f64> = (0..32).map(|i| i as f64 * 0.1).collect();
        let shifted: Vec<f64> = steady.iter().map(|v| v + 5.0).collect();

        let baseline = ModelSnapshot::new("m1")
            .with_layer("hidden", steady.clone())
            .with_layer("output", steady.clone());

        let hidden_drifted = DriftDetector::default().detect(
            &ModelSnapshot::new("m1")
                .with_layer("hidden", shifted.clone())
                .with_layer("output", steady.clone()),
            &baseline,
        );
        let output_drifted = DriftDetector::default().detect(
            &ModelSnapshot::new("m1")
                .with_layer("hidden", steady.clone())
                .with_layer("output", shifted),
            &baseline,
        );

        assert!(
            output_drifted.overall_drift_score > hidden_drifted.overall_drift_score,
            "same movement on an output layer must weigh more: {} vs {}",
            output_drifted.overall_drift_score,
            hidden_drifted.overall_drift_score
        );
    }

    #[test]
    fn test_output_distribution_shift_flags_drift() {
        let mut base_dist = BTreeMap::new();
        base_dist.insert("cat".to_string(), 0.9);
        base_dist.insert("dog".to_string(), 0.1);
        let mut cur_dist = BTreeMap::new();
        cur_dist.insert("cat".to_string(), 0.1);
        cur_dist.insert("dog".to_string(), 0.9);

        let baseline = ModelSnapshot::new("m1").with_output_distribution(base_dist);
        let current = ModelSnapshot::new("m1").with_output_distribution(cur_dist);

        let result = DriftDetector::default().detect(&current, &baseline);
        assert!(result.output_distribution_drift > DEFAULT_DRIFT_THRESHOLD);
        assert!(result.has_drift);
    }

    #[test]
    fn test_performance_regression_flags_drift() {
        let baseline = ModelSnapshot::new("m1").with_metrics(Some(0.95), Some(0.1));
        let current = ModelSnapshot::new("m1").with_metrics(Some(0.60), Some(0.1));
        let result = DriftDetector::default().detect(&current, &baseline);
        assert!(result.performance_drift > DEFAULT_DRIFT_THRESHOLD);
        assert!(result.has_drift);
    }

    #[test]
    fn test_missing_metrics_do_not_drift() {
        let baseline = ModelSnapshot::new("m1").with_metrics(Some(0.95), None);
        let current = ModelSnapshot::new("m1").with_metrics(None, Some(0.4));
        let result = DriftDetector::default().detect(&current, &baseline);
        assert_eq!(result.performance_drift, 0.0, "one-sided metrics are ignored");
    }
}
