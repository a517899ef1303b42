//! Sensor sampler trait and runtime state.
//!
//! Every telemetry feed implements the [`SensorSampler`] trait, which provides
//! metadata via [`SamplerInfo`], availability checking, and reading collection.
//! A synthetic generator and a real-feed adapter are interchangeable behind it.

use std::time::Duration;

use crate::error::SensorUnavailable;
use crate::reading::Reading;

/// Where readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// Generated in-process from a random number generator.
    Synthetic,
    /// Replayed from a fixed sequence (fixtures, recorded sessions).
    Replay,
    /// Fetched from a remote telemetry feed.
    Remote,
}

impl std::fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synthetic => write!(f, "synthetic"),
            Self::Replay => write!(f, "replay"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Metadata about a sampler.
#[derive(Debug, Clone)]
pub struct SamplerInfo {
    /// Unique identifier (e.g. `"synthetic"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    pub kind: SamplerKind,
}

/// Trait that every telemetry feed must implement.
pub trait SensorSampler: Send + Sync {
    /// Sampler metadata.
    fn info(&self) -> &SamplerInfo;

    /// Check if this sampler can currently produce readings.
    fn is_available(&self) -> bool;

    /// Produce one reading, or report that no data is available.
    ///
    /// `Err` means "no data", never "nothing is wrong".
    fn sample(&self) -> Result<Reading, SensorUnavailable>;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Runtime health of the sampler driven by a hub.
#[derive(Debug, Clone)]
pub struct SamplerState {
    pub total_readings: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub last_sample_time: Duration,
    pub last_error: Option<String>,
    pub healthy: bool,
}

impl SamplerState {
    pub fn new() -> Self {
        Self {
            total_readings: 0,
            failures: 0,
            consecutive_failures: 0,
            last_sample_time: Duration::ZERO,
            last_error: None,
            healthy: true,
        }
    }

    pub fn record_success(&mut self, elapsed: Duration) {
        self.total_readings += 1;
        self.consecutive_failures = 0;
        self.last_sample_time = elapsed;
        self.last_error = None;
        self.healthy = true;
    }

    pub fn record_failure(&mut self, elapsed: Duration, err: &SensorUnavailable) {
        self.failures += 1;
        self.consecutive_failures += 1;
        self.last_sample_time = elapsed;
        self.last_error = Some(err.reason.clone());
        self.healthy = false;
    }
}

impl Default for SamplerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tracks_failures_and_recovery() {
        let mut state = SamplerState::new();
        state.record_failure(Duration::from_millis(3), &SensorUnavailable::new("timeout"));
        state.record_failure(Duration::from_millis(3), &SensorUnavailable::new("timeout"));
        assert!(!state.healthy);
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.last_error.as_deref(), Some("timeout"));

        state.record_success(Duration::from_millis(1));
        assert!(state.healthy);
        assert_eq!(state.failures, 2);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.total_readings, 1);
        assert!(state.last_error.is_none());
    }
}
