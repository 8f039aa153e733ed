//! AI Integrity Core - Detection & Scoring Engine
//!
//! Detects integrity violations in deployed models and their data:
//! poisoning in datasets, adversarial perturbations in inference inputs,
//! drift and tampering in running models, and query patterns indicative of
//! model extraction. External plumbing (HTTP, persistence, message bus,
//! dashboards) stays behind the collaborator traits in `bridge` and
//! `alerts`.
//!
//! ## Architecture
//! - `stats` - vector statistics shared by every detector
//! - `scoring` - statistical, isolation, reconstruction, influence and
//!   gradient-signature scorers
//! - `ensemble` - weighted aggregation into a `ThreatAssessment`
//! - `integrity` - model fingerprinting and drift analysis
//! - `theft` - extraction-pattern scoring over query windows
//! - `pipeline` - the `DetectionEngine` facade over the scorers
//! - `monitor` - per-model polling sessions behind a keyed registry

pub mod alerts;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod ensemble;
pub mod error;
pub mod integrity;
pub mod monitor;
pub mod pipeline;
pub mod scoring;
pub mod stats;
pub mod theft;

pub use alerts::{AlertDispatcher, AlertEvent, AlertSink, LogAlertSink};
pub use bridge::{Reconstructor, SnapshotProvider};
pub use config::DetectionConfig;
pub use ensemble::{
    AnomalyScore, EnsembleAggregator, EnsembleWeights, MethodScores, ScoreMethod,
    ThreatAssessment, ThreatLevel,
};
pub use error::{DetectionError, MonitorError};
pub use integrity::{
    DriftDetector, DriftResult, FingerprintRegistry, IntegrityResult, ModelFingerprint,
    ModelSnapshot,
};
pub use monitor::{MonitoringSession, SessionRegistry, SessionState};
pub use pipeline::{AdversarialAssessment, DetectionEngine};
pub use scoring::{
    GradientSignatureAnalyzer, InfluenceScorer, IsolationScorer, ReconstructionScorer, Sample,
    SignatureFamily, SignatureScores, StatisticalAnomalyScorer,
};
pub use stats::BaselineStatistics;
pub use theft::{QueryRecord, TheftAssessment, TheftPatternAnalyzer};
