//! `maintwatch serve`: HTTP telemetry server.

use std::sync::Arc;

use maintwatch_core::{Clock, FEATURE_LAYOUT, MonitorConfig, SystemClock};

pub fn run(config: &MonitorConfig, remote: Option<&str>) {
    super::ensure_valid(config);

    // The artifact is checked before anything listens.
    let service = Arc::new(super::load_service(config));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = Arc::new(super::make_hub(config, remote, clock));

    let base = config.base_url();
    println!("maintwatch server v{}", maintwatch_core::VERSION);
    println!("   {base}");
    println!("   sampler:  {}", hub.sampler().name());
    println!(
        "   model:    {} ({})",
        service.status().model_name.unwrap_or_default(),
        config.model_path.display()
    );
    println!(
        "   window:   {}s, polling every {}ms",
        config.window_seconds, config.sample_interval_ms
    );
    println!();
    println!("   Endpoints:");
    println!("     GET  /                 API index");
    println!("     GET  /sensor-data      Latest reading");
    println!("     GET  /features         Rolling-window features");
    println!("     POST /predict          Classify a feature vector");
    println!("     GET  /predict/current  Classify the current window");
    println!("     POST /model/reload     Reload the artifact from disk");
    println!("     GET  /health           Sampler and model status");
    println!();
    println!("   Example:");
    println!(
        "     curl -X POST {base}/predict -H 'content-type: application/json' \\\n       -d '{{\"{}\": 0.6, \"{}\": 0.05, \"{}\": 12.0, \"{}\": 1.5}}'",
        FEATURE_LAYOUT[0], FEATURE_LAYOUT[1], FEATURE_LAYOUT[2], FEATURE_LAYOUT[3]
    );
    println!();

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| super::fail("starting runtime", e));
    if let Err(e) = rt.block_on(maintwatch_server::run_server(config, hub, service)) {
        super::fail(&format!("serving on {}", config.bind_addr()), e);
    }
}
