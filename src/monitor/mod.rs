//! Continuous Monitoring
//!
//! Per-model polling sessions: pull a snapshot, fingerprint it, run the
//! drift detector against the session baseline, and hand violations to the
//! alert dispatcher. One session per model, enforced by a keyed registry
//! owned by the composition root - no ambient static state.

mod session;

pub use session::{MonitoringSession, SessionState};

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::alerts::AlertDispatcher;
use crate::bridge::SnapshotProvider;
use crate::error::MonitorError;
use crate::integrity::{fingerprint, DriftDetector, IntegrityResult, ModelSnapshot};

use session::SessionHandle;

/// How long `stop` waits for a cooperative exit before aborting the task.
const STOP_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// REGISTRY
// ============================================================================

pub struct SessionRegistry {
    provider: Arc<dyn SnapshotProvider>,
    dispatcher: Arc<AlertDispatcher>,
    drift_threshold: f64,
    poll_interval: Duration,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(
        provider: Arc<dyn SnapshotProvider>,
        dispatcher: Arc<AlertDispatcher>,
        drift_threshold: f64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            drift_threshold,
            poll_interval,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Begin monitoring a model. Fails if a session for this model is
    /// already active; the check and the registration happen under one
    /// write lock, so two concurrent starts cannot both win.
    pub fn start_monitoring(&self, model_id: &str) -> Result<MonitoringSession, MonitorError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(model_id) {
            return Err(MonitorError::AlreadyMonitoring(model_id.to_string()));
        }

        let mut info = MonitoringSession {
            session_id: uuid::Uuid::new_v4().to_string(),
            model_id: model_id.to_string(),
            state: SessionState::Created,
            started_at: Utc::now(),
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            self.provider.clone(),
            self.dispatcher.clone(),
            DriftDetector::new(self.drift_threshold),
            model_id.to_string(),
            self.poll_interval,
            stop_rx,
        ));
        info.state = SessionState::Running;

        log::info!("monitoring started for model '{}' (session {})", model_id, info.session_id);
        sessions.insert(model_id.to_string(), SessionHandle { info: info.clone(), stop_tx, task });
        Ok(info)
    }

    /// Stop monitoring a model. Idempotent: stopping a model with no
    /// active session is a no-op returning false.
    pub fn stop_monitoring(&self, model_id: &str) -> bool {
        let handle = self.sessions.write().remove(model_id);
        let Some(handle) = handle else {
            return false;
        };

        // Cooperative first; abort only if the task outlives the grace
        // period (e.g. wedged on the snapshot collaborator).
        let _ = handle.stop_tx.send(true);
        let task = handle.task;
        tokio::spawn(async move {
            let abort = task.abort_handle();
            if tokio::time::timeout(STOP_GRACE, task).await.is_err() {
                log::warn!("monitoring task did not stop within {:?}, aborting", STOP_GRACE);
                abort.abort();
            }
        });

        log::info!("monitoring stopped for model '{}'", model_id);
        true
    }

    pub fn is_monitoring(&self, model_id: &str) -> bool {
        self.sessions.read().contains_key(model_id)
    }

    pub fn active_sessions(&self) -> Vec<MonitoringSession> {
        self.sessions.read().values().map(|h| h.info.clone()).collect()
    }

    /// Stop every session, e.g. on service shutdown.
    pub fn shutdown(&self) {
        let model_ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        for model_id in model_ids {
            self.stop_monitoring(&model_id);
        }
    }
}

// ============================================================================
// POLL LOOP
// ============================================================================

/// One session's polling loop. The first successful snapshot becomes the
/// drift baseline; each later poll compares against it and notifies the
/// dispatcher on violations. Every wait is cancellable through the watch
/// channel.
async fn poll_loop(
    provider: Arc<dyn SnapshotProvider>,
    dispatcher: Arc<AlertDispatcher>,
    drift: DriftDetector,
    model_id: String,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut baseline: Option<ModelSnapshot> = None;
    let mut baseline_hash: [u8; 32] = [0; 32];

    loop {
        match provider.snapshot(&model_id).await {
            Ok(snapshot) => match &baseline {
                None => {
                    baseline_hash = fingerprint(&snapshot).overall_hash;
                    log::debug!("baseline snapshot captured for model '{}'", model_id);
                    baseline = Some(snapshot);
                }
                Some(base) => {
                    let drift_result = drift.detect(&snapshot, base);
                    let fingerprint_changed = fingerprint(&snapshot).overall_hash != baseline_hash;
                    let result = IntegrityResult {
                        model_id: model_id.clone(),
                        drift: drift_result,
                        fingerprint_changed,
                        checked_at: Utc::now(),
                    };
                    dispatcher.notify_integrity(&result).await;
                }
            },
            Err(e) => {
                log::warn!("poll failed for model '{}': {}", model_id, e);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
    log::debug!("poll loop for model '{}' exited", model_id);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertEvent, AlertSink, LogAlertSink};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        baseline: ModelSnapshot,
        drifted: ModelSnapshot,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotProvider for ScriptedProvider {
        async fn snapshot(&self, _model_id: &str) -> Result<ModelSnapshot, MonitorError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Ok(self.baseline.clone())
            } else {
                Ok(self.drifted.clone())
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AlertEvent>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn publish(&self, event: AlertEvent) -> Result<(), String> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    fn snapshots() -> (ModelSnapshot, ModelSnapshot) {
        let ramp: Vec<f64> = (0..64).map(|i| i as f64 / 32.0 - 1.0).collect();
        let scaled: Vec<f64> = ramp.iter().map(|v| v * 3.0).collect();
        let baseline = ModelSnapshot::new("m1").with_layer("output", ramp);
        let drifted = ModelSnapshot::new("m1").with_layer("output", scaled);
        (baseline, drifted)
    }

    fn registry_with(
        provider: Arc<dyn SnapshotProvider>,
        sink: Arc<dyn AlertSink>,
        interval_ms: u64,
    ) -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(
            provider,
            Arc::new(AlertDispatcher::new(sink)),
            0.15,
            Duration::from_millis(interval_ms),
        ))
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let (baseline, drifted) = snapshots();
        let provider = Arc::new(ScriptedProvider { baseline, drifted, polls: AtomicUsize::new(0) });
        let registry = registry_with(provider, Arc::new(LogAlertSink), 1000);

        let session = registry.start_monitoring("m1").expect("first start");
        assert!(session.active());

        let err = registry.start_monitoring("m1").unwrap_err();
        assert_eq!(err, MonitorError::AlreadyMonitoring("m1".to_string()));

        registry.stop_monitoring("m1");
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (baseline, drifted) = snapshots();
        let provider = Arc::new(ScriptedProvider { baseline, drifted, polls: AtomicUsize::new(0) });
        let registry = registry_with(provider, Arc::new(LogAlertSink), 1000);

        assert!(!registry.stop_monitoring("never-started"), "stopping nothing is a no-op");

        registry.start_monitoring("m1").expect("start");
        assert!(registry.is_monitoring("m1"));
        assert!(registry.stop_monitoring("m1"));
        assert!(!registry.stop_monitoring("m1"), "second stop is a no-op");
        assert!(!registry.is_monitoring("m1"));

        // A fresh session may start after stop
        registry.start_monitoring("m1").expect("restart after stop");
        registry.stop_monitoring("m1");
    }

    #[tokio::test]
    async fn test_drift_reaches_the_alert_sink() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (baseline, drifted) = snapshots();
        let provider = Arc::new(ScriptedProvider { baseline, drifted, polls: AtomicUsize::new(0) });
        let sink = Arc::new(RecordingSink::default());
        let registry = registry_with(provider.clone(), sink.clone(), 10);

        registry.start_monitoring("m1").expect("start");

        // First poll sets the baseline, later polls see the scaled layer
        tokio::time::sleep(Duration::from_millis(100)).await;
        registry.stop_monitoring("m1");

        let events = sink.events.lock();
        assert!(!events.is_empty(), "scaled weights must produce an integrity alert");
        assert_eq!(events[0].event_type, crate::alerts::events::INTEGRITY_VIOLATION);
        assert_eq!(events[0].model_id, "m1");
    }

    #[tokio::test]
    async fn test_stop_cancels_polling() {
        let (baseline, drifted) = snapshots();
        let provider = Arc::new(ScriptedProvider { baseline, drifted, polls: AtomicUsize::new(0) });
        let registry = registry_with(provider.clone(), Arc::new(LogAlertSink), 10);

        registry.start_monitoring("m1").expect("start");
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.stop_monitoring("m1");

        tokio::time::sleep(Duration::from_millis(30)).await;
        let polls_at_stop = provider.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        let polls_later = provider.polls.load(Ordering::SeqCst);
        assert!(
            polls_later <= polls_at_stop + 1,
            "polling must cease after stop: {} -> {}",
            polls_at_stop,
            polls_later
        );
    }

    #[tokio::test]
    async fn test_identical_snapshots_do_not_alert() {
        let (baseline, _) = snapshots();
        let provider = Arc::new(ScriptedProvider {
            baseline: baseline.clone(),
            drifted: baseline,
            polls: AtomicUsize::new(0),
        });
        let sink = Arc::new(RecordingSink::default());
        let registry = registry_with(provider, sink.clone(), 10);

        registry.start_monitoring("m1").expect("start");
        tokio::time::sleep(Duration::from_millis(80)).await;
        registry.stop_monitoring("m1");

        assert!(sink.events.lock().is_empty(), "a steady model must stay quiet");
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let (baseline, drifted) = snapshots();
        let provider = Arc::new(ScriptedProvider { baseline, drifted, polls: AtomicUsize::new(0) });
        let registry = registry_with(provider, Arc::new(LogAlertSink), 1000);

        registry.start_monitoring("m1").expect("start m1");
        registry.start_monitoring("m2").expect("start m2");
        assert_eq!(registry.active_sessions().len(), 2);

        registry.shutdown();
        assert!(registry.active_sessions().is_empty());
    }
}
