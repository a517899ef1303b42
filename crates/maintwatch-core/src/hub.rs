//! Telemetry hub: one sampler feeding one aggregator.
//!
//! The hub is the single ingestion path. Each [`TelemetryHub::poll`] takes a
//! reading from the sampler, pushes it through the aggregator and records
//! sampler health. Readers get the latest accepted reading or the current
//! features; a failed poll makes the latest reading unavailable instead of
//! leaving a stale value in place.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::aggregator::{FeatureAggregator, IngestOutcome, WindowSnapshot};
use crate::error::{InsufficientData, SensorUnavailable};
use crate::features::FeatureVector;
use crate::reading::Reading;
use crate::sampler::{SamplerState, SensorSampler};

struct HubState {
    latest: Option<Reading>,
    last_error: Option<SensorUnavailable>,
    sampler: SamplerState,
    rejected: u64,
}

/// Health summary of the sampler and window.
#[derive(Debug, Clone, Serialize)]
pub struct HubHealth {
    pub sampler: String,
    pub sampler_kind: String,
    pub healthy: bool,
    pub total_readings: u64,
    pub rejected_readings: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
    pub last_sample_ms: f64,
    pub window: WindowSnapshot,
}

pub struct TelemetryHub {
    sampler: Box<dyn SensorSampler>,
    aggregator: FeatureAggregator,
    state: Mutex<HubState>,
}

impl TelemetryHub {
    pub fn new(sampler: Box<dyn SensorSampler>, aggregator: FeatureAggregator) -> Self {
        Self {
            sampler,
            aggregator,
            state: Mutex::new(HubState {
                latest: None,
                last_error: None,
                sampler: SamplerState::new(),
                rejected: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sampler(&self) -> &dyn SensorSampler {
        self.sampler.as_ref()
    }

    pub fn aggregator(&self) -> &FeatureAggregator {
        &self.aggregator
    }

    /// Take one reading from the sampler and ingest it.
    ///
    /// A panicking sampler is treated like an unavailable one.
    pub fn poll(&self) -> Result<(Reading, IngestOutcome), SensorUnavailable> {
        let t0 = Instant::now();
        let sampled = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.sampler.sample()
        }))
        .unwrap_or_else(|_| Err(SensorUnavailable::new("sampler panicked")));
        let elapsed = t0.elapsed();

        match sampled {
            Ok(reading) => {
                let outcome = self.aggregator.ingest(reading);
                let mut state = self.lock();
                state.sampler.record_success(elapsed);
                state.last_error = None;
                if outcome.is_accepted() {
                    state.latest = Some(reading);
                } else {
                    state.rejected += 1;
                }
                log::debug!("polled {}: {outcome:?}", self.sampler.name());
                Ok((reading, outcome))
            }
            Err(err) => {
                self.record_failure(elapsed, err.clone());
                Err(err)
            }
        }
    }

    /// Record a failure observed outside `poll`, e.g. a transport timeout.
    pub fn record_failure(&self, elapsed: Duration, err: SensorUnavailable) {
        log::warn!("{}: {err}", self.sampler.name());
        let mut state = self.lock();
        state.sampler.record_failure(elapsed, &err);
        state.last_error = Some(err);
    }

    /// Latest accepted reading, unless the most recent poll failed.
    pub fn latest_reading(&self) -> Result<Reading, SensorUnavailable> {
        let state = self.lock();
        if let Some(err) = &state.last_error {
            return Err(err.clone());
        }
        state
            .latest
            .ok_or_else(|| SensorUnavailable::new("no reading received yet"))
    }

    pub fn current_features(&self) -> Result<FeatureVector, InsufficientData> {
        self.aggregator.current_features()
    }

    pub fn health(&self) -> HubHealth {
        let window = self.aggregator.snapshot();
        let state = self.lock();
        HubHealth {
            sampler: self.sampler.name().to_string(),
            sampler_kind: self.sampler.info().kind.to_string(),
            healthy: state.sampler.healthy,
            total_readings: state.sampler.total_readings,
            rejected_readings: state.rejected,
            failures: state.sampler.failures,
            consecutive_failures: state.sampler.consecutive_failures,
            last_error: state.sampler.last_error.clone(),
            last_sample_ms: state.sampler.last_sample_time.as_secs_f64() * 1000.0,
            window,
        }
    }
}
