//! Theft Pattern Analyzer
//!
//! Scores a window of query records for model-extraction behavior: high
//! request frequency, low query diversity, and (when the response-similarity
//! collaborator supplies it) high response correlation. The correlation
//! input defaults to 0.0 when absent - it is a collaborator concern, not
//! something this module estimates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{
    THEFT_CORRELATION_WEIGHT, THEFT_DIVERSITY_WEIGHT, THEFT_FREQUENCY_SATURATION,
    THEFT_FREQUENCY_WEIGHT,
};
use crate::ensemble::ThreatLevel;

// ============================================================================
// TYPES
// ============================================================================

/// One inference request against the protected model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Stable hash of the query payload; equality means a repeated query.
    pub query_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(query_hash: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { query_hash: query_hash.into(), timestamp }
    }
}

/// Extraction-risk verdict for one query window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheftAssessment {
    pub query_count: usize,
    /// Queries per second over the window.
    pub frequency: f64,
    /// Distinct queries / total queries in [0,1].
    pub diversity: f64,
    pub response_correlation: f64,
    pub theft_probability: f64,
    pub risk_level: ThreatLevel,
}

// ============================================================================
// ANALYZER
// ============================================================================

pub struct TheftPatternAnalyzer {
    frequency_saturation: f64,
}

impl Default for TheftPatternAnalyzer {
    fn default() -> Self {
        Self { frequency_saturation: THEFT_FREQUENCY_SATURATION }
    }
}

impl TheftPatternAnalyzer {
    pub fn new(frequency_saturation: f64) -> Self {
        Self { frequency_saturation: frequency_saturation.max(f64::MIN_POSITIVE) }
    }

    /// Score a window of queries. `window_secs` is the observation window
    /// the records were collected over; `response_correlation` comes from
    /// the response-similarity collaborator when available.
    pub fn analyze(
        &self,
        records: &[QueryRecord],
        window_secs: f64,
        response_correlation: Option<f64>,
    ) -> TheftAssessment {
        let correlation = response_correlation.unwrap_or(0.0).clamp(0.0, 1.0);

        if records.is_empty() || window_secs <= 0.0 {
            return TheftAssessment {
                query_count: 0,
                frequency: 0.0,
                diversity: 0.0,
                response_correlation: correlation,
                theft_probability: 0.0,
                risk_level: ThreatLevel::Low,
            };
        }

        let count = records.len();
        let frequency = count as f64 / window_secs;
        let frequency_norm = (frequency / self.frequency_saturation).min(1.0);

        let distinct: HashSet<&str> = records.iter().map(|r| r.query_hash.as_str()).collect();
        let diversity = distinct.len() as f64 / count as f64;

        let theft_probability = (THEFT_FREQUENCY_WEIGHT * frequency_norm
            + THEFT_DIVERSITY_WEIGHT * (1.0 - diversity)
            + THEFT_CORRELATION_WEIGHT * correlation)
            .clamp(0.0, 1.0);

        let risk_level = risk_level(theft_probability);
        if risk_level >= ThreatLevel::High {
            log::warn!(
                "extraction pattern: {} queries at {:.2}/s, diversity {:.2}, probability {:.2}",
                count,
                frequency,
                diversity,
                theft_probability
            );
        }

        TheftAssessment {
            query_count: count,
            frequency,
            diversity,
            response_correlation: correlation,
            theft_probability,
            risk_level,
        }
    }
}

/// Risk ladder with strict boundaries: exactly 0.8 is still High.
fn risk_level(probability: f64) -> ThreatLevel {
    if probability > 0.8 {
        ThreatLevel::Critical
    } else if probability > 0.6 {
        ThreatLevel::High
    } else if probability > 0.4 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

// ============================================================================
// TESTS
// ============================================================================
