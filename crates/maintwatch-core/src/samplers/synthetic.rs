//! SyntheticSampler: uniform random readings in a plausible operating
//! envelope. Stands in for a real sensor feed with the same reading shape.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::Clock;
use crate::error::SensorUnavailable;
use crate::reading::Reading;
use crate::sampler::{SamplerInfo, SamplerKind, SensorSampler};

/// Vibration envelope (g).
pub const VIBRATION_RANGE: RangeInclusive<f64> = 0.4..=0.8;
/// Temperature envelope (°C).
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 50.0..=100.0;
/// Pressure envelope (psi).
pub const PRESSURE_RANGE: RangeInclusive<f64> = 25.0..=35.0;

static SYNTHETIC_INFO: SamplerInfo = SamplerInfo {
    name: "synthetic",
    description: "Uniform random readings: vibration 0.4-0.8 g, temperature 50-100 °C, pressure 25-35 psi",
    kind: SamplerKind::Synthetic,
};

/// Random reading generator. Seeded instances are reproducible given a
/// deterministic clock.
pub struct SyntheticSampler {
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl SyntheticSampler {
    /// Sampler seeded from OS randomness.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            clock,
        }
    }

    /// Deterministic sampler for tests and reproducible demos.
    pub fn seeded(seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            clock,
        }
    }
}

impl SensorSampler for SyntheticSampler {
    fn info(&self) -> &SamplerInfo {
        &SYNTHETIC_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn sample(&self) -> Result<Reading, SensorUnavailable> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Reading::new(
            self.clock.now(),
            rng.random_range(VIBRATION_RANGE),
            rng.random_range(TEMPERATURE_RANGE),
            rng.random_range(PRESSURE_RANGE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn readings_stay_in_envelope() {
        let sampler = SyntheticSampler::new(clock());
        for _ in 0..500 {
            let r = sampler.sample().unwrap();
            assert!(VIBRATION_RANGE.contains(&r.vibration), "{r:?}");
            assert!(TEMPERATURE_RANGE.contains(&r.temperature), "{r:?}");
            assert!(PRESSURE_RANGE.contains(&r.pressure), "{r:?}");
        }
    }

    #[test]
    fn seeded_samplers_are_reproducible() {
        let clock = clock();
        let a = SyntheticSampler::seeded(42, Arc::clone(&clock));
        let b = SyntheticSampler::seeded(42, clock);
        for _ in 0..20 {
            assert_eq!(a.sample().unwrap(), b.sample().unwrap());
        }
    }

    #[test]
    fn timestamps_come_from_clock() {
        let clock = clock();
        let sampler = SyntheticSampler::seeded(1, Arc::clone(&clock));
        assert_eq!(sampler.sample().unwrap().timestamp, clock.now());
    }
}
