//! `maintwatch sample`: poll the sampler and print readings with features.

use std::sync::Arc;

use maintwatch_core::{Clock, MonitorConfig, SystemClock};

pub fn run(config: &MonitorConfig, remote: Option<&str>, count: usize, json: bool) {
    super::ensure_valid(config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = super::make_hub(config, remote, clock);

    if !json {
        println!(
            "Sampling {count} readings from {} every {}ms (window {}s)",
            hub.sampler().name(),
            config.sample_interval_ms,
            config.window_seconds
        );
        println!();
        println!(
            "{:<28} {:>9} {:>8} {:>8}  {:>9} {:>9} {:>9} {:>9}",
            "timestamp", "vib", "temp", "press", "mean_vib", "std_vib", "temp_diff", "press_diff"
        );
    }

    for i in 0..count {
        if i > 0 {
            std::thread::sleep(config.sample_interval());
        }
        let polled = hub.poll();
        let features = hub.current_features();

        if json {
            let line = serde_json::json!({
                "reading": polled.as_ref().ok().map(|(r, _)| r),
                "error": polled.as_ref().err().map(ToString::to_string),
                "features": features.ok(),
            });
            println!("{line}");
            continue;
        }

        match polled {
            Ok((reading, outcome)) => {
                let stats = match features {
                    Ok(f) => format!(
                        "{:>9.4} {:>9.4} {:>9.2} {:>9.2}",
                        f.mean_vibration, f.std_vibration, f.temp_difference, f.pressure_diff
                    ),
                    Err(e) => e.to_string(),
                };
                let flag = if outcome.is_accepted() {
                    String::new()
                } else {
                    format!("  [{outcome:?}]")
                };
                println!(
                    "{:<28} {:>9.4} {:>8.2} {:>8.2}  {stats}{flag}",
                    reading.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                    reading.vibration,
                    reading.temperature,
                    reading.pressure
                );
            }
            Err(e) => println!("{:<28} {e}", "unavailable"),
        }
    }
}
