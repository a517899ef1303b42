//! Dashboard client: polls a running server and keeps what the dashboard
//! renders.
//!
//! Features are derived from the client's own rolling window of polled
//! readings. That window runs on the server's timeline: its clock follows
//! the newest reading received, so clock skew between the two hosts never
//! rejects a reading, and a reading polled twice is windowed once. Every
//! fetch failure is rendered as unavailable; the dashboard never shows a
//! stale reading, stale features or a decision it could not obtain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use maintwatch_core::samplers::RemoteSampler;
use maintwatch_core::{
    Clock, FeatureAggregator, FeatureVector, ManualClock, PredictionResult, Reading,
    SensorSampler,
};

/// Result of one dashboard refresh.
#[derive(Debug, Clone)]
pub struct Tick {
    pub at: DateTime<Utc>,
    pub reading: Result<Reading, String>,
    pub features: Result<FeatureVector, String>,
    pub prediction: Result<PredictionResult, String>,
}

pub struct DashboardClient {
    base_url: String,
    sensor: RemoteSampler,
    agent: ureq::Agent,
    aggregator: FeatureAggregator,
    /// Drives `aggregator`; set to the newest windowed reading's timestamp.
    window_clock: Arc<ManualClock>,
    /// Timestamp of the newest reading in the window.
    last_windowed: Mutex<Option<DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl DashboardClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let window_clock = Arc::new(ManualClock::new(clock.now()));
        Self {
            sensor: RemoteSampler::new(format!("{base_url}/sensor-data"), timeout),
            agent: ureq::AgentBuilder::new()
                .timeout_connect(timeout)
                .timeout(timeout)
                .build(),
            aggregator: FeatureAggregator::new(window, window_clock.clone()),
            window_clock,
            last_windowed: Mutex::new(None),
            base_url,
            clock,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Poll the sensor, update the local window and ask for a decision.
    pub fn tick(&self) -> Tick {
        let at = self.clock.now();
        let reading = self.sensor.sample().map_err(|e| e.to_string());
        let features = match &reading {
            Ok(r) => {
                self.window(*r);
                self.aggregator.current_features().map_err(|e| e.to_string())
            }
            Err(_) => Err("unavailable: no sensor reading".to_string()),
        };
        let prediction = match &features {
            Ok(f) => self.predict(f),
            Err(e) => Err(e.clone()),
        };

        Tick {
            at,
            reading,
            features,
            prediction,
        }
    }

    /// Add a polled reading to the local window unless it is already there.
    fn window(&self, reading: Reading) {
        let mut last = self.last_windowed.lock().unwrap_or_else(|e| e.into_inner());
        if last.is_some_and(|t| reading.timestamp <= t) {
            log::debug!("reading at {} already windowed", reading.timestamp);
            return;
        }
        self.window_clock.set(reading.timestamp);
        let outcome = self.aggregator.ingest(reading);
        if outcome.is_accepted() {
            *last = Some(reading.timestamp);
        } else {
            log::warn!("reading at {} not windowed: {outcome:?}", reading.timestamp);
        }
    }

    fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, String> {
        let url = format!("{}/predict", self.base_url);
        match self.agent.post(&url).send_json(features) {
            Ok(resp) => resp
                .into_json::<PredictionResult>()
                .map_err(|e| format!("undecodable prediction: {e}")),
            Err(ureq::Error::Status(code, resp)) => {
                let body: Option<serde_json::Value> = resp.into_json().ok();
                let code_name = body
                    .as_ref()
                    .and_then(|b| b["error"].as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("HTTP {code}"));
                Err(code_name)
            }
            Err(ureq::Error::Transport(t)) => Err(format!("{url}: {t}")),
        }
    }
}

/// A point on the dashboard time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub at: DateTime<Utc>,
    pub reading: Reading,
}

/// Everything the dashboard renders. Updated only through [`DashboardState::apply`].
#[derive(Debug, Clone)]
pub struct DashboardState {
    history: VecDeque<HistoryPoint>,
    history_len: usize,
    last: Option<Tick>,
    ticks: u64,
    failures: u64,
}

impl DashboardState {
    pub fn new(history_len: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_len),
            history_len: history_len.max(1),
            last: None,
            ticks: 0,
            failures: 0,
        }
    }

    pub fn apply(&mut self, tick: Tick) {
        self.ticks += 1;
        match &tick.reading {
            Ok(reading) => {
                self.history.push_back(HistoryPoint {
                    at: tick.at,
                    reading: *reading,
                });
                while self.history.len() > self.history_len {
                    self.history.pop_front();
                }
            }
            Err(_) => self.failures += 1,
        }
        self.last = Some(tick);
    }

    /// Latest reading, only if the most recent poll succeeded.
    pub fn reading(&self) -> Option<&Reading> {
        self.last.as_ref().and_then(|t| t.reading.as_ref().ok())
    }

    pub fn features(&self) -> Option<&FeatureVector> {
        self.last.as_ref().and_then(|t| t.features.as_ref().ok())
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.last.as_ref().and_then(|t| t.prediction.as_ref().ok())
    }

    /// Reason the most recent reading is missing.
    pub fn reading_error(&self) -> Option<&str> {
        self.last
            .as_ref()
            .and_then(|t| t.reading.as_ref().err().map(String::as_str))
    }

    pub fn prediction_error(&self) -> Option<&str> {
        self.last
            .as_ref()
            .and_then(|t| t.prediction.as_ref().err().map(String::as_str))
    }

    pub fn history(&self) -> &VecDeque<HistoryPoint> {
        &self.history
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Human label for the current decision.
    pub fn status_label(&self) -> String {
        match (self.prediction(), self.prediction_error()) {
            (Some(p), _) if p.maintenance_needed => "MAINTENANCE NEEDED".to_string(),
            (Some(_), _) => "OK".to_string(),
            (None, Some(e)) => format!("unavailable ({e})"),
            (None, None) => "waiting".to_string(),
        }
    }

    /// One-line rendering for `--plain`.
    pub fn plain_line(&self) -> String {
        let at = self
            .last
            .as_ref()
            .map(|t| t.at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default();
        let reading = match (self.reading(), self.reading_error()) {
            (Some(r), _) => format!(
                "vib={:.4} temp={:.2} press={:.2}",
                r.vibration, r.temperature, r.pressure
            ),
            (None, Some(e)) => format!("reading unavailable ({e})"),
            (None, None) => "reading unavailable".to_string(),
        };
        let features = match self.features() {
            Some(f) => format!(
                "mean={:.4} std={:.4} dT={:.2} dP={:.2}",
                f.mean_vibration, f.std_vibration, f.temp_difference, f.pressure_diff
            ),
            None => "features unavailable".to_string(),
        };
        let confidence = self
            .prediction()
            .map(|p| format!(" conf={}", crate::commands::format_confidence(p.confidence)))
            .unwrap_or_default();
        format!("{at}  {reading}  {features}  {}{confidence}", self.status_label())
    }
}
