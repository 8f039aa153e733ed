//! Central Configuration Constants
//!
//! Single source of truth for all detection defaults.
//! To change a default threshold, only edit this file (or override it
//! at runtime through `config::DetectionConfig`).

/// Covariance regularization epsilon added to the diagonal before inversion.
pub const COVARIANCE_EPSILON: f64 = 1e-6;

/// Decay rate for mapping a distance into [0,1] via `1 - exp(-lambda * d)`.
/// With 0.5, a 3-sigma Mahalanobis distance maps to ~0.78.
pub const DEFAULT_DISTANCE_LAMBDA: f64 = 0.5;

/// Reconstruction error above this maps to the maximum score of 1.0.
pub const DEFAULT_RECONSTRUCTION_THRESHOLD: f64 = 0.15;

/// Neutral score returned when the reconstruction collaborator is unavailable.
pub const NEUTRAL_RECONSTRUCTION_SCORE: f64 = 0.5;

/// Influence scores below this are dropped from the result set.
pub const DEFAULT_INFLUENCE_THRESHOLD: f64 = 0.7;

/// Number of trees in the isolation ensemble.
pub const DEFAULT_ISOLATION_TREES: usize = 100;

/// Maximum subsample size per isolation tree.
pub const ISOLATION_SUBSAMPLE: usize = 256;

/// Per-family gradient signature thresholds. Sub-threshold signals are
/// zeroed so they do not contribute to the ensemble.
pub const FGSM_THRESHOLD: f64 = 0.7;
pub const PGD_THRESHOLD: f64 = 0.75;
pub const CW_THRESHOLD: f64 = 0.8;

/// Sign-change rate a vector must reach before it counts as FGSM-like.
pub const FGSM_SIGN_CHANGE_MIN: f64 = 0.3;

/// A sample joins `anomalous_samples` only above this combined score.
pub const DEFAULT_VOTING_THRESHOLD: f64 = 0.5;

/// Batch aggregation: `0.7 * mean + 0.3 * max` keeps a single severe
/// outlier from being diluted by a large clean batch.
pub const BATCH_MEAN_WEIGHT: f64 = 0.7;
pub const BATCH_MAX_WEIGHT: f64 = 0.3;

/// Per-layer drift combination weights (PSI / Wasserstein proxy / KS proxy).
pub const DRIFT_PSI_WEIGHT: f64 = 0.4;
pub const DRIFT_WASSERSTEIN_WEIGHT: f64 = 0.3;
pub const DRIFT_KS_WEIGHT: f64 = 0.3;

/// Any drift component above this flags the model as drifted.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.15;

/// Number of histogram bins for PSI computation.
pub const PSI_BINS: usize = 10;

/// Weights rounded to this many decimal digits before fingerprinting, to
/// tolerate floating-point noise from repeated serialization.
pub const FINGERPRINT_ROUNDING_DIGITS: u32 = 6;

/// Theft probability combination weights (frequency / low diversity /
/// response correlation).
pub const THEFT_FREQUENCY_WEIGHT: f64 = 0.4;
pub const THEFT_DIVERSITY_WEIGHT: f64 = 0.3;
pub const THEFT_CORRELATION_WEIGHT: f64 = 0.3;

/// Queries per second at which the frequency component saturates at 1.0.
pub const THEFT_FREQUENCY_SATURATION: f64 = 10.0;

/// Theft probability above this is forwarded to the alerting collaborator.
pub const THEFT_ALERT_THRESHOLD: f64 = 0.7;

/// Default monitoring poll interval (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Crate version
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
