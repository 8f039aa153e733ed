//! Collaborator Bridge
//!
//! Boundary traits for the external model-serving collaborator. The core
//! never owns a model; it asks for snapshots and reconstructions and
//! degrades gracefully when the collaborator is offline.

use async_trait::async_trait;

use crate::error::MonitorError;
use crate::integrity::ModelSnapshot;
use crate::scoring::Sample;

/// Supplies the current snapshot of a deployed model on demand.
/// The call may block on I/O, so it is async and awaited off any
/// latency-sensitive thread.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self, model_id: &str) -> Result<ModelSnapshot, MonitorError>;
}

/// External autoencoder/denoiser used by the reconstruction scorer.
/// An error here is recovered with a neutral score, never propagated.
pub trait Reconstructor: Send + Sync {
    fn reconstruct(&self, sample: &Sample) -> Result<Sample, String>;
}
