//! `maintwatch replay`: feed a recorded session through the pipeline.
//!
//! The feature window runs on a logical clock that follows the recorded
//! timestamps, so a session replays with the same window contents it had
//! when it was captured.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use maintwatch_core::samplers::ReplaySampler;
use maintwatch_core::session::{load_session_meta, load_session_readings};
use maintwatch_core::{
    Clock, FeatureAggregator, FeatureVector, InferenceService, ManualClock, MonitorConfig,
    PredictionResult, Reading, TelemetryHub,
};

/// Decision for one replayed reading.
#[derive(Debug, Serialize)]
pub struct ReplayStep {
    pub reading: Reading,
    pub features: Option<FeatureVector>,
    pub prediction: Option<PredictionResult>,
    pub error: Option<String>,
}

/// Replay `readings` in order, classifying the window after each one.
pub fn replay_readings(
    readings: Vec<Reading>,
    config: &MonitorConfig,
    service: &InferenceService,
) -> Vec<ReplayStep> {
    let Some(first) = readings.first() else {
        return Vec::new();
    };
    let clock = Arc::new(ManualClock::new(first.timestamp));
    let hub = TelemetryHub::new(
        Box::new(ReplaySampler::new(readings.iter().copied())),
        FeatureAggregator::new(config.window(), clock.clone() as Arc<dyn Clock>),
    );

    readings
        .iter()
        .map(|recorded| {
            // Never rewind: out-of-order rows are ingested as late arrivals.
            if recorded.timestamp > clock.now() {
                clock.set(recorded.timestamp);
            }
            let (reading, _) = match hub.poll() {
                Ok(polled) => polled,
                Err(e) => {
                    return ReplayStep {
                        reading: *recorded,
                        features: None,
                        prediction: None,
                        error: Some(e.to_string()),
                    };
                }
            };
            match hub.current_features() {
                Ok(features) => {
                    let (prediction, error) = match service.predict(&features) {
                        Ok(p) => (Some(p), None),
                        Err(e) => (None, Some(e.to_string())),
                    };
                    ReplayStep {
                        reading,
                        features: Some(features),
                        prediction,
                        error,
                    }
                }
                Err(e) => ReplayStep {
                    reading,
                    features: None,
                    prediction: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}

pub fn run(config: &MonitorConfig, session: &Path, json: bool) {
    super::ensure_valid(config);
    let readings =
        load_session_readings(session).unwrap_or_else(|e| super::fail("loading session", e));
    let service = super::load_service(config);

    if !json {
        match load_session_meta(session) {
            Ok(meta) => println!(
                "Session {} ({} readings from {}, started {})",
                meta.id,
                meta.total_readings,
                meta.sampler,
                meta.started_at.to_rfc3339()
            ),
            Err(e) => println!("Session {} (no metadata: {e})", session.display()),
        }
        println!(
            "Window {}s, model {}",
            config.window_seconds,
            service.status().model_name.unwrap_or_default()
        );
        println!();
    }

    let steps = replay_readings(readings, config, &service);
    let mut flagged = 0usize;
    for step in &steps {
        if step.prediction.is_some_and(|p| p.maintenance_needed) {
            flagged += 1;
        }
        if json {
            match serde_json::to_string(step) {
                Ok(line) => println!("{line}"),
                Err(e) => super::fail("encoding step", e),
            }
            continue;
        }
        let decision = match (&step.prediction, &step.error) {
            (Some(p), _) => format!(
                "maintenance_needed={:<5} confidence={}",
                p.maintenance_needed,
                super::format_confidence(p.confidence)
            ),
            (None, Some(e)) => e.clone(),
            (None, None) => "no decision".to_string(),
        };
        println!(
            "{}  vib={:.4} temp={:.2} press={:.2}  {decision}",
            step.reading
                .timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            step.reading.vibration,
            step.reading.temperature,
            step.reading.pressure
        );
    }

    if !json {
        println!();
        println!("{flagged}/{} windows flagged for maintenance", steps.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use maintwatch_core::model::LogisticClassifier;

    fn temp_model() -> InferenceService {
        // Fires once the temperature spread in the window exceeds 20.
        let model = LogisticClassifier::new("spread", [0.0, 0.0, 1.0, 0.0], -20.0);
        InferenceService::new(Arc::new(model)).unwrap()
    }

    #[test]
    fn replay_follows_recorded_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let readings = vec![
            Reading::new(t0, 0.5, 50.0, 30.0),
            Reading::new(t0 + TimeDelta::seconds(1), 0.5, 80.0, 30.0),
            // 20s later: with a 10s window only this reading remains.
            Reading::new(t0 + TimeDelta::seconds(21), 0.5, 80.0, 30.0),
        ];
        let config = MonitorConfig {
            window_seconds: 10,
            ..Default::default()
        };

        let steps = replay_readings(readings, &config, &temp_model());
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].features.unwrap().temp_difference, 0.0);
        assert!(!steps[0].prediction.unwrap().maintenance_needed);
        assert_eq!(steps[1].features.unwrap().temp_difference, 30.0);
        assert!(steps[1].prediction.unwrap().maintenance_needed);
        assert_eq!(steps[2].features.unwrap().temp_difference, 0.0);
        assert!(!steps[2].prediction.unwrap().maintenance_needed);
    }

    #[test]
    fn replay_reports_model_unavailable_per_step() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let service = InferenceService::unloaded("no artifact");
        let steps = replay_readings(
            vec![Reading::new(t0, 0.5, 50.0, 30.0)],
            &MonitorConfig::default(),
            &service,
        );
        assert!(steps[0].prediction.is_none());
        assert!(steps[0].error.as_deref().unwrap().contains("model unavailable"));
    }

    #[test]
    fn empty_session_replays_nothing() {
        let steps = replay_readings(Vec::new(), &MonitorConfig::default(), &temp_model());
        assert!(steps.is_empty());
    }
}
