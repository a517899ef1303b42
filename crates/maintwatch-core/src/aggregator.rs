//! Rolling-window feature aggregation.
//!
//! Architecture:
//! 1. Readings are inserted in timestamp order into a single window
//! 2. Entries older than `now - window` are evicted on every insert and query
//! 3. Features are computed on demand from the surviving readings
//! 4. Insert+evict and queries share one lock, so a query never sees a
//!    half-pruned window
//!
//! "Now" comes from the injected [`Clock`], which keeps eviction testable
//! without sleeping.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::clock::Clock;
use crate::error::InsufficientData;
use crate::features::FeatureVector;
use crate::reading::Reading;

/// What happened to an ingested reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Inserted into the window.
    Accepted,
    /// Older than the window; dropped.
    Stale,
    /// Stamped after the clock's current time; dropped.
    Future,
    /// A channel was NaN or infinite; dropped.
    NonFinite,
}

impl IngestOutcome {
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// Point-in-time description of the window contents.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSnapshot {
    pub window_seconds: f64,
    pub sample_count: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Thread-safe time-bounded window over sensor readings.
pub struct FeatureAggregator {
    window: TimeDelta,
    clock: Arc<dyn Clock>,
    readings: Mutex<VecDeque<Reading>>,
}

impl FeatureAggregator {
    /// Create an aggregator keeping readings from the last `window`.
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            clock,
            readings: Mutex::new(VecDeque::new()),
        }
    }

    /// Configured window length.
    pub fn window(&self) -> Duration {
        self.window.to_std().unwrap_or(Duration::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Reading>> {
        self.readings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn evict(buf: &mut VecDeque<Reading>, cutoff: DateTime<Utc>) {
        while buf.front().is_some_and(|r| r.timestamp < cutoff) {
            buf.pop_front();
        }
    }

    /// Add a reading and evict everything that fell out of the window.
    pub fn ingest(&self, reading: Reading) -> IngestOutcome {
        if let Some(channel) = reading.non_finite_channel() {
            log::warn!("dropping reading at {}: non-finite {channel}", reading.timestamp);
            return IngestOutcome::NonFinite;
        }

        let now = self.clock.now();
        let cutoff = self.cutoff(now);
        if reading.timestamp > now {
            log::warn!(
                "dropping reading at {}: ahead of clock ({now})",
                reading.timestamp
            );
            return IngestOutcome::Future;
        }
        if reading.timestamp < cutoff {
            log::debug!("dropping stale reading at {}", reading.timestamp);
            return IngestOutcome::Stale;
        }

        let mut buf = self.lock();
        // Late arrivals still land in timestamp order.
        let pos = buf.partition_point(|r| r.timestamp <= reading.timestamp);
        buf.insert(pos, reading);
        Self::evict(&mut buf, cutoff);
        IngestOutcome::Accepted
    }

    /// Features over `[now - window, now]`, or [`InsufficientData`] when no
    /// reading falls in that range.
    pub fn current_features(&self) -> Result<FeatureVector, InsufficientData> {
        let now = self.clock.now();
        let mut buf = self.lock();
        Self::evict(&mut buf, self.cutoff(now));
        let end = buf.partition_point(|r| r.timestamp <= now);
        compute_features(buf.range(..end))
    }

    /// Window contents summary, after pruning.
    pub fn snapshot(&self) -> WindowSnapshot {
        let now = self.clock.now();
        let mut buf = self.lock();
        Self::evict(&mut buf, self.cutoff(now));
        let end = buf.partition_point(|r| r.timestamp <= now);
        self.describe(&buf, end)
    }

    /// Features together with the summary of the exact window they were
    /// computed from.
    pub fn features_with_snapshot(
        &self,
    ) -> (Result<FeatureVector, InsufficientData>, WindowSnapshot) {
        let now = self.clock.now();
        let mut buf = self.lock();
        Self::evict(&mut buf, self.cutoff(now));
        let end = buf.partition_point(|r| r.timestamp <= now);
        (compute_features(buf.range(..end)), self.describe(&buf, end))
    }

    fn describe(&self, buf: &VecDeque<Reading>, end: usize) -> WindowSnapshot {
        WindowSnapshot {
            window_seconds: self.window.num_milliseconds() as f64 / 1000.0,
            sample_count: end,
            oldest: buf.range(..end).next().map(|r| r.timestamp),
            newest: buf.range(..end).next_back().map(|r| r.timestamp),
        }
    }

    /// Readings currently held (before time-based pruning).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Compute the four features over a set of readings.
pub fn compute_features<'a>(
    readings: impl IntoIterator<Item = &'a Reading>,
) -> Result<FeatureVector, InsufficientData> {
    let mut vibration = Vec::new();
    let mut temperature = Vec::new();
    let mut pressure = Vec::new();
    for r in readings {
        vibration.push(r.vibration);
        temperature.push(r.temperature);
        pressure.push(r.pressure);
    }
    if vibration.is_empty() {
        return Err(InsufficientData);
    }

    let std_vibration = if vibration.len() < 2 {
        0.0
    } else {
        Statistics::population_std_dev(&vibration)
    };

    Ok(FeatureVector {
        mean_vibration: Statistics::mean(&vibration),
        std_vibration,
        temp_difference: Statistics::max(&temperature) - Statistics::min(&temperature),
        pressure_diff: Statistics::max(&pressure) - Statistics::min(&pressure),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn setup(window_secs: u64) -> (Arc<ManualClock>, FeatureAggregator) {
        let clock = Arc::new(ManualClock::new(t0()));
        let agg = FeatureAggregator::new(Duration::from_secs(window_secs), clock.clone());
        (clock, agg)
    }

    fn reading(at: DateTime<Utc>, vibration: f64, temperature: f64, pressure: f64) -> Reading {
        Reading::new(at, vibration, temperature, pressure)
    }

    #[test]
    fn empty_window_is_insufficient() {
        let (_clock, agg) = setup(60);
        assert_eq!(agg.current_features(), Err(InsufficientData));
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let (_clock, agg) = setup(60);
        assert!(agg.ingest(reading(t0(), 0.6, 70.0, 30.0)).is_accepted());
        let f = agg.current_features().unwrap();
        assert_eq!(f, FeatureVector::new(0.6, 0.0, 0.0, 0.0));
    }

    #[test]
    fn population_std_of_one_two_three() {
        let (clock, agg) = setup(60);
        for v in [1.0, 2.0, 3.0] {
            agg.ingest(reading(clock.now(), v, 60.0, 30.0));
            clock.advance(TimeDelta::seconds(1));
        }
        let f = agg.current_features().unwrap();
        assert!((f.std_vibration - 0.816_496_580_927_726).abs() < 1e-9, "{f:?}");
        assert!((f.mean_vibration - 2.0).abs() < 1e-12);
    }

    #[test]
    fn identical_values_have_zero_std() {
        let (clock, agg) = setup(60);
        agg.ingest(reading(clock.now(), 0.5, 60.0, 30.0));
        clock.advance(TimeDelta::seconds(1));
        agg.ingest(reading(clock.now(), 0.5, 60.0, 30.0));
        assert_eq!(agg.current_features().unwrap().std_vibration, 0.0);
    }

    #[test]
    fn temperature_range_is_max_minus_min() {
        let (clock, agg) = setup(60);
        for (temp, pressure) in [(50.0, 25.0), (80.0, 35.0), (65.0, 30.0)] {
            agg.ingest(reading(clock.now(), 0.5, temp, pressure));
            clock.advance(TimeDelta::seconds(1));
        }
        let f = agg.current_features().unwrap();
        assert_eq!(f.temp_difference, 30.0);
        assert_eq!(f.pressure_diff, 10.0);
    }

    #[test]
    fn old_readings_are_evicted() {
        let (clock, agg) = setup(10);
        agg.ingest(reading(clock.now(), 0.8, 100.0, 35.0));
        clock.advance(TimeDelta::seconds(11));
        agg.ingest(reading(clock.now(), 0.4, 50.0, 25.0));

        let f = agg.current_features().unwrap();
        assert_eq!(f, FeatureVector::new(0.4, 0.0, 0.0, 0.0));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn query_prunes_without_insert() {
        let (clock, agg) = setup(5);
        agg.ingest(reading(clock.now(), 0.5, 60.0, 30.0));
        clock.advance(TimeDelta::seconds(6));
        assert_eq!(agg.current_features(), Err(InsufficientData));
        assert!(agg.is_empty());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let (clock, agg) = setup(10);
        agg.ingest(reading(clock.now(), 0.5, 60.0, 30.0));
        clock.advance(TimeDelta::seconds(10));
        assert!(agg.current_features().is_ok());
        clock.advance(TimeDelta::milliseconds(1));
        assert!(agg.current_features().is_err());
    }

    #[test]
    fn rejects_stale_future_and_non_finite() {
        let (clock, agg) = setup(10);
        let now = clock.now();
        assert_eq!(
            agg.ingest(reading(now - TimeDelta::seconds(11), 0.5, 60.0, 30.0)),
            IngestOutcome::Stale
        );
        assert_eq!(
            agg.ingest(reading(now + TimeDelta::seconds(1), 0.5, 60.0, 30.0)),
            IngestOutcome::Future
        );
        assert_eq!(
            agg.ingest(reading(now, f64::NAN, 60.0, 30.0)),
            IngestOutcome::NonFinite
        );
        assert!(agg.is_empty());
    }

    #[test]
    fn late_arrivals_are_ordered() {
        let (clock, agg) = setup(60);
        let start = clock.now();
        clock.advance(TimeDelta::seconds(5));
        agg.ingest(reading(start + TimeDelta::seconds(4), 0.7, 60.0, 30.0));
        agg.ingest(reading(start + TimeDelta::seconds(1), 0.5, 60.0, 30.0));
        let snap = agg.snapshot();
        assert_eq!(snap.sample_count, 2);
        assert_eq!(snap.oldest, Some(start + TimeDelta::seconds(1)));
        assert_eq!(snap.newest, Some(start + TimeDelta::seconds(4)));
    }

    #[test]
    fn readings_ahead_of_rewound_clock_are_ignored() {
        let (clock, agg) = setup(60);
        clock.advance(TimeDelta::seconds(5));
        agg.ingest(reading(clock.now(), 0.9, 90.0, 34.0));
        clock.advance(TimeDelta::seconds(-3));
        agg.ingest(reading(clock.now(), 0.5, 60.0, 30.0));
        let f = agg.current_features().unwrap();
        assert_eq!(f.mean_vibration, 0.5);
        assert_eq!(agg.snapshot().sample_count, 1);
    }

    #[test]
    fn only_window_readings_are_reflected() {
        // Ten readings one second apart through a 4 s window: only the last
        // five (t-4 .. t) contribute.
        let (clock, agg) = setup(4);
        for i in 0..10 {
            agg.ingest(reading(clock.now(), i as f64, 50.0 + i as f64, 25.0));
            clock.advance(TimeDelta::seconds(1));
        }
        clock.advance(TimeDelta::seconds(-1));
        let f = agg.current_features().unwrap();
        assert_eq!(f.mean_vibration, 7.0);
        assert_eq!(f.temp_difference, 4.0);
        assert_eq!(agg.snapshot().sample_count, 5);
    }

    #[test]
    fn features_and_snapshot_describe_one_window() {
        let (clock, agg) = setup(10);
        let (features, snap) = agg.features_with_snapshot();
        assert_eq!(features, Err(InsufficientData));
        assert_eq!(snap.sample_count, 0);

        agg.ingest(reading(clock.now(), 0.4, 50.0, 25.0));
        clock.advance(TimeDelta::seconds(5));
        agg.ingest(reading(clock.now(), 0.8, 70.0, 35.0));
        clock.advance(TimeDelta::seconds(6));

        let (features, snap) = agg.features_with_snapshot();
        assert_eq!(features.unwrap(), FeatureVector::new(0.8, 0.0, 0.0, 0.0));
        assert_eq!(snap.sample_count, 1);
        assert_eq!(snap.oldest, snap.newest);
    }

    #[test]
    fn concurrent_features_match_their_snapshot() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(t0()));
        let agg = Arc::new(FeatureAggregator::new(Duration::from_secs(3600), clock));
        std::thread::scope(|s| {
            let writer = Arc::clone(&agg);
            s.spawn(move || {
                for i in 0..200 {
                    let vibration = if i % 2 == 0 { 0.0 } else { 1.0 };
                    writer.ingest(reading(t0(), vibration, 60.0, 30.0));
                }
            });
            for _ in 0..200 {
                let (features, snap) = agg.features_with_snapshot();
                if let Ok(f) = features {
                    // Inserts alternate 0, 1, 0, ... so n readings hold n / 2 ones.
                    let n = snap.sample_count;
                    let expected = (n / 2) as f64 / n as f64;
                    assert!((f.mean_vibration - expected).abs() < 1e-9, "{snap:?} {f:?}");
                }
            }
        });
    }

    #[test]
    fn concurrent_ingest_and_query() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(t0()));
        let agg = Arc::new(FeatureAggregator::new(Duration::from_secs(3600), clock));
        std::thread::scope(|s| {
            for _ in 0..4 {
                let agg = Arc::clone(&agg);
                s.spawn(move || {
                    for _ in 0..100 {
                        agg.ingest(reading(t0(), 0.5, 60.0, 30.0));
                        let f = agg.current_features().unwrap();
                        assert_eq!(f.mean_vibration, 0.5);
                    }
                });
            }
        });
        assert_eq!(agg.len(), 400);
    }
}
