//! Basic pipeline example.
//!
//! Samples synthetic readings, derives rolling-window features and asks the
//! shipped classifier artifact for a maintenance decision.
//!
//! Run: `cargo run --example basic`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use maintwatch_core::model::load_artifact;
use maintwatch_core::samplers::SyntheticSampler;
use maintwatch_core::{Clock, FeatureAggregator, InferenceService, SystemClock, TelemetryHub};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = TelemetryHub::new(
        Box::new(SyntheticSampler::seeded(42, clock.clone())),
        FeatureAggregator::new(Duration::from_secs(10), clock),
    );
    let service = InferenceService::new(load_artifact(Path::new(
        "models/maintenance_forest.json",
    ))?)?;

    for _ in 0..5 {
        let (reading, outcome) = hub.poll()?;
        println!(
            "vibration={:.3} temperature={:.1} pressure={:.2} ({outcome:?})",
            reading.vibration, reading.temperature, reading.pressure
        );
        std::thread::sleep(Duration::from_millis(200));
    }

    let features = hub.current_features()?;
    println!("features: {features:?}");

    let decision = service.predict(&features)?;
    println!(
        "maintenance needed: {} (confidence {})",
        decision.maintenance_needed,
        decision
            .confidence
            .map(|c| format!("{c:.3}"))
            .unwrap_or_else(|| "n/a".into())
    );
    Ok(())
}
