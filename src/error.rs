//! Error Types
//!
//! Detection errors are batch-fatal and surfaced to the caller; recoverable
//! conditions (singular covariance, missing collaborators, too few samples)
//! are handled locally by the engines and never appear here.

use std::fmt;

// ============================================================================
// DETECTION ERRORS
// ============================================================================

/// Errors surfaced by the scoring engines.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Sample feature count does not match the baseline dimensionality.
    /// The baseline is shared across the batch, so this fails the whole call.
    DimensionMismatch { expected: usize, actual: usize },
    /// The batch contained no samples.
    EmptyBatch,
    /// A configuration value is outside its documented range.
    InvalidConfig(String),
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: baseline has {} features, sample has {}", expected, actual)
            }
            DetectionError::EmptyBatch => write!(f, "empty sample batch"),
            DetectionError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for DetectionError {}

// ============================================================================
// MONITORING ERRORS
// ============================================================================

/// Errors from the monitoring session registry.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// A session for this model is already active. Not retried automatically.
    AlreadyMonitoring(String),
    /// The snapshot collaborator failed to supply a snapshot.
    SnapshotUnavailable(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::AlreadyMonitoring(model_id) => {
                write!(f, "model '{}' is already being monitored", model_id)
            }
            MonitorError::SnapshotUnavailable(msg) => {
                write!(f, "snapshot unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for MonitorError {}
