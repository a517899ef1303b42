//! Maintenance inference service.
//!
//! Wraps a shared, immutable classifier artifact and turns feature vectors
//! into maintenance decisions:
//!
//! 1. Validate the vector (every field finite); reject with
//!    [`InferenceError::InvalidFeatureVector`] otherwise
//! 2. Call the artifact synchronously with the vector in layout order
//! 3. On artifact failure, take the artifact out of service: this and every
//!    later call returns [`InferenceError::ModelUnavailable`] until
//!    [`InferenceService::reload`] installs a checked artifact
//!
//! There is no fallback prediction. The artifact itself is never mutated;
//! only the slot holding it is swapped, so concurrent `predict` calls need
//! nothing more than a read lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, InferenceError};
use crate::features::FeatureVector;
use crate::model::{Classifier, self_check};

/// Outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub maintenance_needed: bool,
    /// Probability of the returned decision, when the artifact exposes a score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

enum ModelSlot {
    Loaded {
        classifier: Arc<dyn Classifier>,
        loaded_at: DateTime<Utc>,
    },
    Unavailable {
        reason: String,
    },
}

/// Service status for health endpoints and dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub model_loaded: bool,
    pub model_name: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub unavailable_reason: Option<String>,
    pub predictions: u64,
    pub rejected: u64,
    pub failures: u64,
    pub avg_latency_us: f64,
}

pub struct InferenceService {
    slot: RwLock<ModelSlot>,
    predictions: AtomicU64,
    rejected: AtomicU64,
    failures: AtomicU64,
    latency_sum_us: AtomicU64,
}

impl InferenceService {
    /// Start a service around an artifact, running the startup self-check.
    pub fn new(classifier: Arc<dyn Classifier>) -> Result<Self, ArtifactError> {
        self_check(classifier.as_ref())?;
        Ok(Self::with_slot(ModelSlot::Loaded {
            classifier,
            loaded_at: Utc::now(),
        }))
    }

    /// A service with no artifact; every prediction is `ModelUnavailable`.
    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self::with_slot(ModelSlot::Unavailable {
            reason: reason.into(),
        })
    }

    fn with_slot(slot: ModelSlot) -> Self {
        Self {
            slot: RwLock::new(slot),
            predictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, ModelSlot> {
        self.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, ModelSlot> {
        self.slot.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Classify a feature vector.
    pub fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        if let Err(e) = vector.validate() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        let classifier = match &*self.read_slot() {
            ModelSlot::Loaded { classifier, .. } => Arc::clone(classifier),
            ModelSlot::Unavailable { reason } => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(InferenceError::ModelUnavailable {
                    reason: reason.clone(),
                });
            }
        };

        let t0 = Instant::now();
        let outcome = classifier.classify(&vector.to_array()).and_then(|c| match c.score {
            Some(s) if !(0.0..=1.0).contains(&s) => Err(ArtifactError::Evaluation(format!(
                "score {s} outside [0, 1]"
            ))),
            _ => Ok(c),
        });
        let elapsed_us = t0.elapsed().as_micros() as u64;

        match outcome {
            Ok(c) => {
                self.predictions.fetch_add(1, Ordering::Relaxed);
                self.latency_sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
                Ok(PredictionResult {
                    maintenance_needed: c.label,
                    confidence: c
                        .score
                        .map(|p| if c.label { p } else { 1.0 - p }),
                })
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let reason = format!("artifact '{}' failed: {e}", classifier.name());
                log::error!("{reason}; refusing predictions until reload");
                self.take_out_of_service(&classifier, &reason);
                Err(InferenceError::ModelUnavailable { reason })
            }
        }
    }

    /// Mark the slot unavailable, unless a reload already replaced `failed`.
    fn take_out_of_service(&self, failed: &Arc<dyn Classifier>, reason: &str) {
        let mut slot = self.write_slot();
        if let ModelSlot::Loaded { classifier, .. } = &*slot {
            if !Arc::ptr_eq(classifier, failed) {
                return;
            }
        }
        *slot = ModelSlot::Unavailable {
            reason: reason.to_string(),
        };
    }

    /// Install a new artifact after it passes the self-check. On failure the
    /// current slot is left untouched.
    pub fn reload(&self, classifier: Arc<dyn Classifier>) -> Result<(), ArtifactError> {
        self_check(classifier.as_ref())?;
        log::info!("inference service now serving '{}'", classifier.name());
        *self.write_slot() = ModelSlot::Loaded {
            classifier,
            loaded_at: Utc::now(),
        };
        Ok(())
    }

    /// Take the artifact out of service.
    pub fn unload(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::info!("inference service unloaded: {reason}");
        *self.write_slot() = ModelSlot::Unavailable { reason };
    }

    pub fn is_available(&self) -> bool {
        matches!(&*self.read_slot(), ModelSlot::Loaded { .. })
    }

    pub fn status(&self) -> ServiceStatus {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let latency = self.latency_sum_us.load(Ordering::Relaxed);
        let avg_latency_us = if predictions > 0 {
            latency as f64 / predictions as f64
        } else {
            0.0
        };
        let (model_loaded, model_name, loaded_at, unavailable_reason) = match &*self.read_slot() {
            ModelSlot::Loaded {
                classifier,
                loaded_at,
            } => (true, Some(classifier.name().to_string()), Some(*loaded_at), None),
            ModelSlot::Unavailable { reason } => (false, None, None, Some(reason.clone())),
        };
        ServiceStatus {
            model_loaded,
            model_name,
            loaded_at,
            unavailable_reason,
            predictions,
            rejected: self.rejected.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            avg_latency_us,
        }
    }
}
