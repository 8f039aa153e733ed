//! Alert Dispatch
//!
//! Fire-and-forget notifications to the alerting/messaging collaborator.
//! The dispatcher decides what crosses the wire: High/Critical threat
//! assessments, integrity violations, and theft probability above the
//! configured threshold. A failing sink is logged and dropped, never
//! propagated into a detection call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::THEFT_ALERT_THRESHOLD;
use crate::ensemble::{ThreatAssessment, ThreatLevel};
use crate::integrity::IntegrityResult;
use crate::theft::TheftAssessment;

/// Event names
pub mod events {
    pub const THREAT_DETECTED: &str = "integrity:threat-detected";
    pub const INTEGRITY_VIOLATION: &str = "integrity:violation";
    pub const EXTRACTION_SUSPECTED: &str = "integrity:extraction-suspected";
}

// ============================================================================
// EVENT & SINK
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub event_type: String,
    pub model_id: String,
    pub severity: ThreatLevel,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Messaging collaborator boundary. Delivery is best-effort.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, event: AlertEvent) -> Result<(), String>;
}

/// Default sink: writes alerts to the log, so a deployment without a
/// message bus still surfaces violations.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn publish(&self, event: AlertEvent) -> Result<(), String> {
        log::warn!(
            "[ALERT] {} model='{}' severity={} payload={}",
            event.event_type,
            event.model_id,
            event.severity,
            event.payload
        );
        Ok(())
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    theft_alert_threshold: f64,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink, theft_alert_threshold: THEFT_ALERT_THRESHOLD }
    }

    pub fn with_theft_threshold(mut self, threshold: f64) -> Self {
        self.theft_alert_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Forward a threat assessment when it reaches High.
    pub async fn notify_threat(&self, model_id: &str, assessment: &ThreatAssessment) {
        if assessment.threat_level < ThreatLevel::High {
            return;
        }
        self.emit(AlertEvent {
            event_type: events::THREAT_DETECTED.to_string(),
            model_id: model_id.to_string(),
            severity: assessment.threat_level,
            payload: serde_json::json!({
                "threat_score": assessment.threat_score,
                "anomalous_samples": assessment.anomalous_samples.len(),
                "methods": assessment.contributing_methods,
            }),
            timestamp: Utc::now(),
        })
        .await;
    }

    /// Forward a monitoring poll result when anything moved.
    pub async fn notify_integrity(&self, result: &IntegrityResult) {
        if !result.is_violation() {
            return;
        }
        let severity = if result.fingerprint_changed { ThreatLevel::Critical } else { ThreatLevel::High };
        self.emit(AlertEvent {
            event_type: events::INTEGRITY_VIOLATION.to_string(),
            model_id: result.model_id.clone(),
            severity,
            payload: serde_json::json!({
                "overall_drift_score": result.drift.overall_drift_score,
                "has_drift": result.drift.has_drift,
                "fingerprint_changed": result.fingerprint_changed,
            }),
            timestamp: result.checked_at,
        })
        .await;
    }

    /// Forward a theft assessment above the configured probability.
    pub async fn notify_theft(&self, model_id: &str, assessment: &TheftAssessment) {
        if assessment.theft_probability <= self.theft_alert_threshold {
            return;
        }
        self.emit(AlertEvent {
            event_type: events::EXTRACTION_SUSPECTED.to_string(),
            model_id: model_id.to_string(),
            severity: assessment.risk_level,
            payload: serde_json::json!({
                "theft_probability": assessment.theft_probability,
                "query_count": assessment.query_count,
                "frequency": assessment.frequency,
                "diversity": assessment.diversity,
            }),
            timestamp: Utc::now(),
        })
        .await;
    }

    async fn emit(&self, event: AlertEvent) {
        let event_type = event.event_type.clone();
        if let Err(e) = self.sink.publish(event).await {
            log::error!("failed to publish '{}': {}", event_type, e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
