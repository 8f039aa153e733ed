//! Isolation Scorer
//!
//! Unsupervised outlier scoring used when no baseline exists: an ensemble
//! of randomized partition trees where short isolation paths mark
//! anomalies. Scores follow the standard `2^(-E[h]/c(n))` formulation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{DEFAULT_ISOLATION_TREES, ISOLATION_SUBSAMPLE};
use crate::ensemble::{AnomalyScore, ScoreMethod};

use super::Sample;

/// Euler-Mascheroni constant, for the average-path-length normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

pub struct IsolationScorer {
    n_trees: usize,
    seed: Option<u64>,
}

impl Default for IsolationScorer {
    fn default() -> Self {
        Self::new(DEFAULT_ISOLATION_TREES)
    }
}

impl IsolationScorer {
    /// Production constructor: entropy-seeded, non-deterministic.
    pub fn new(n_trees: usize) -> Self {
        Self { n_trees: n_trees.max(1), seed: None }
    }

    /// Deterministic constructor for tests and reproducible runs.
    pub fn with_seed(n_trees: usize, seed: u64) -> Self {
        Self { n_trees: n_trees.max(1), seed: Some(seed) }
    }

    /// Score every sample in the batch; 1.0 = most anomalous.
    pub fn score(&self, samples: &[Sample]) -> Vec<AnomalyScore> {
        let n = samples.len();
        if n == 0 {
            return vec![];
        }
        if n == 1 {
            // A single point cannot be isolated from anything.
            return vec![AnomalyScore::new(0, 0.5, ScoreMethod::Isolation)];
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let subsample = n.min(ISOLATION_SUBSAMPLE);
        let max_depth = (subsample as f64).log2().ceil() as usize;

        let mut path_sums = vec![0.0f64; n];
        let mut path_counts = vec![0u32; n];

        for _ in 0..self.n_trees {
            let mut indices: Vec<usize> = if subsample < n {
                (0..subsample).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            partition(samples, &mut indices, 0, max_depth, &mut rng, &mut |idx, depth| {
                path_sums[idx] += depth;
                path_counts[idx] += 1;
            });
        }

        let normalizer = average_path_length(subsample as f64);
        samples
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let score = if path_counts[i] == 0 {
                    // Never drawn into a subsample; neutral.
                    0.5
                } else {
                    let expected = path_sums[i] / path_counts[i] as f64;
                    2f64.powf(-expected / normalizer)
                };
                AnomalyScore::new(i, score, ScoreMethod::Isolation)
            })
            .collect()
    }
}

/// Expected path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: f64) -> f64 {
    if n <= 1.0 {
        return 1.0;
    }
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Recursively partition `indices` on a random feature at a random split
/// point, recording the termination depth of every point.
fn partition(
    samples: &[Sample],
    indices: &mut Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
    record: &mut impl FnMut(usize, f64),
) {
    if indices.len() == 1 {
        record(indices[0], depth as f64);
        return;
    }
    if depth >= max_depth {
        // Unresolved subtree: charge the estimated remaining depth.
        let residual = average_path_length(indices.len() as f64);
        for &idx in indices.iter() {
            record(idx, depth as f64 + residual);
        }
        return;
    }

    let dim = samples[indices[0]].dimension();
    if dim == 0 {
        for &idx in indices.iter() {
            record(idx, depth as f64);
        }
        return;
    }

    let feature = rng.gen_range(0..dim);
    let (min, max) = indices.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &idx| {
        let v = samples[idx].features[feature];
        (lo.min(v), hi.max(v))
    });

    if (max - min).abs() < 1e-12 {
        // Constant along this feature: the points are indistinguishable here.
        let residual = average_path_length(indices.len() as f64);
        for &idx in indices.iter() {
            record(idx, depth as f64 + residual);
        }
        return;
    }

    let split = rng.gen_range(min..max);
    let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
        .drain(..)
        .partition(|&idx| samples[idx].features[feature] < split);

    if left.is_empty() || right.is_empty() {
        let side = if left.is_empty() { &mut right } else { &mut left };
        let residual = average_path_length(side.len() as f64);
        for &idx in side.iter() {
            record(idx, depth as f64 + 1.0 + residual);
        }
        return;
    }

    partition(samples, &mut left, depth + 1, max_depth, rng, record);
    partition(samples, &mut right, depth + 1, max_depth, rng, record);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_batch_with_outlier() -> Vec<Sample> {
        let mut samples: Vec<Sample> = (0..60)
            .map(|i| {
                let jitter = (i % 7) as f64 * 0.01;
                Sample::new(vec![1.0 + jitter, -1.0 - jitter, 0.5 + jitter])
            })
            .collect();
        samples.push(Sample::new(vec![40.0, 35.0, -60.0]));
        samples
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let samples = clustered_batch_with_outlier();
        let a = IsolationScorer::with_seed(50, 42).score(&samples);
        let b = IsolationScorer::with_seed(50, 42).score(&samples);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.score, y.score, "same seed must give identical scores");
        }
    }

    #[test]
    fn test_outlier_gets_top_score() {
        let samples = clustered_batch_with_outlier();
        let scores = IsolationScorer::with_seed(100, 7).score(&samples);
        let best = scores
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap())
            .unwrap();
        assert_eq!(best.sample_index, 60, "the far point should isolate fastest");
        assert!(best.score > 0.6, "outlier score too low: {}", best.score);
    }

    #[test]
    fn test_scores_in_unit_range() {
        let samples = clustered_batch_with_outlier();
        for s in IsolationScorer::with_seed(30, 99).score(&samples) {
            assert!((0.0..=1.0).contains(&s.score));
            assert_eq!(s.method, ScoreMethod::Isolation);
        }
    }

    #[test]
    fn test_degenerate_batches() {
        assert!(IsolationScorer::default().score(&[]).is_empty());

        let single = IsolationScorer::default().score(&[Sample::new(vec![1.0])]);
        assert_eq!(single.len(), 1);
        assert!((single[0].score - 0.5).abs() < 1e-12, "lone sample is neutral");

        // Identical points: nothing separates, nothing should stand out
        let identical: Vec<Sample> = (0..10).map(|_| Sample::new(vec![3.0, 3.0])).collect();
        let scores = IsolationScorer::with_seed(20, 1).score(&identical);
        let spread = scores.iter().map(|s| s.score).fold(f64::MIN, f64::max)
            - scores.iter().map(|s| s.score).fold(f64::MAX, f64::min);
        assert!(spread < 1e-9, "identical samples must score identically");
    }
}
