//! Monitoring Session State
//!
//! Data structures only; the registry in `mod.rs` owns the lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    Running,
    Stopped,
}

/// Caller-visible view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSession {
    pub session_id: String,
    pub model_id: String,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
}

impl MonitoringSession {
    pub fn active(&self) -> bool {
        self.state == SessionState::Running
    }
}

/// Registry-internal handle: the cooperative stop signal plus the task.
pub(crate) struct SessionHandle {
    pub(crate) info: MonitoringSession,
    pub(crate) stop_tx: watch::Sender<bool>,
    pub(crate) task: JoinHandle<()>,
}
