//! Model Integrity
//!
//! Fingerprinting and drift analysis over model snapshots.

pub mod drift;
pub mod fingerprint;
pub mod types;

pub use drift::DriftDetector;
pub use fingerprint::{fingerprint, FingerprintRegistry};
pub use types::{DriftResult, IntegrityResult, ModelFingerprint, ModelSnapshot};
