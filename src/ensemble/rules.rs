//! Threat Mapping Rules & Thresholds
//!
//! Threshold constants shared by the poisoning and adversarial pipelines.
//! No aggregation logic here.

/// At or above this combined score = Medium.
pub const THREAT_MEDIUM_MIN: f64 = 0.4;

/// At or above this combined score = High.
pub const THREAT_HIGH_MIN: f64 = 0.6;

/// At or above this combined score = Critical.
pub const THREAT_CRITICAL_MIN: f64 = 0.8;
