//! Ensemble Aggregation
//!
//! Weighted combination of detector scores into a `ThreatAssessment`.
//! `types` holds the data structures, `rules` the threshold constants,
//! `aggregator` the combination logic.

pub mod aggregator;
pub mod rules;
pub mod types;

pub use aggregator::{EnsembleAggregator, MethodScores};
pub use types::{AnomalyScore, EnsembleWeights, ScoreMethod, ThreatAssessment, ThreatLevel};
