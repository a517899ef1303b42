pub mod check_model;
pub mod dashboard;
pub mod predict;
pub mod record;
pub mod replay;
pub mod sample;
pub mod serve;

use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use maintwatch_core::model::load_artifact;
use maintwatch_core::samplers::{RemoteSampler, SyntheticSampler};
use maintwatch_core::{
    Clock, FeatureAggregator, InferenceService, MonitorConfig, SensorSampler, TelemetryHub,
};

/// Flags shared by every command that runs the sampling pipeline.
#[derive(Args, Debug, Default, Clone)]
pub struct PipelineArgs {
    /// Classifier artifact path
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Feature window length in seconds
    #[arg(long)]
    pub window_seconds: Option<u64>,

    /// Milliseconds between sensor polls
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Seed for the synthetic sampler (reproducible readings)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fetch readings from this URL instead of the synthetic sampler
    /// (e.g. http://127.0.0.1:5000/sensor-data)
    #[arg(long)]
    pub remote: Option<String>,
}

impl PipelineArgs {
    /// Apply flags on top of file and environment configuration.
    pub fn apply(&self, config: &mut MonitorConfig) {
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(w) = self.window_seconds {
            config.window_seconds = w;
        }
        if let Some(ms) = self.interval_ms {
            config.sample_interval_ms = ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Print an error and exit non-zero.
pub fn fail(context: &str, err: impl Display) -> ! {
    eprintln!("Error: {context}: {err}");
    std::process::exit(1);
}

/// Defaults, then the config file, then `MAINTWATCH_*` variables.
pub fn load_config(path: Option<&Path>) -> MonitorConfig {
    MonitorConfig::load(path).unwrap_or_else(|e| fail("loading configuration", e))
}

/// Reject configurations the pipeline cannot run with.
pub fn ensure_valid(config: &MonitorConfig) {
    if let Err(e) = config.validate() {
        fail("invalid configuration", e);
    }
}

/// Synthetic sampler unless a remote feed URL is given.
pub fn make_sampler(
    config: &MonitorConfig,
    remote: Option<&str>,
    clock: Arc<dyn Clock>,
) -> Box<dyn SensorSampler> {
    match remote {
        Some(url) => {
            let sampler = RemoteSampler::new(url, config.request_timeout());
            if !sampler.is_available() {
                fail("remote feed", format!("unsupported URL {url:?}"));
            }
            Box::new(sampler)
        }
        None => match config.seed {
            Some(seed) => Box::new(SyntheticSampler::seeded(seed, clock)),
            None => Box::new(SyntheticSampler::new(clock)),
        },
    }
}

pub fn make_hub(config: &MonitorConfig, remote: Option<&str>, clock: Arc<dyn Clock>) -> TelemetryHub {
    TelemetryHub::new(
        make_sampler(config, remote, Arc::clone(&clock)),
        FeatureAggregator::new(config.window(), clock),
    )
}

/// Load the configured artifact and start an inference service. A failed
/// load or self-check aborts the command.
pub fn load_service(config: &MonitorConfig) -> InferenceService {
    let classifier = load_artifact(&config.model_path)
        .unwrap_or_else(|e| fail(&format!("loading {}", config.model_path.display()), e));
    InferenceService::new(classifier).unwrap_or_else(|e| fail("starting inference service", e))
}

/// Parse a duration string like "5m", "30s", "1h", "100ms". Bare numbers are seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s:?}"))?;
    let millis = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration too large: {s:?}"))?;
    Ok(Duration::from_millis(millis))
}

/// Parse `key:value` tags, warning about malformed ones.
pub fn parse_tags(tags: &[String]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for tag in tags {
        if let Some((k, v)) = tag.split_once(':') {
            map.insert(k.to_string(), v.to_string());
        } else {
            eprintln!("Warning: ignoring malformed tag '{tag}' (expected key:value)");
        }
    }
    map
}

/// "0.912" or "n/a" for artifacts without a score.
pub fn format_confidence(confidence: Option<f64>) -> String {
    confidence.map_or_else(|| "n/a".to_string(), |c| format!("{c:.3}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        let err = parse_duration("9999999999999999h").unwrap_err();
        assert!(err.contains("too large"), "{err}");
        assert_eq!(
            parse_duration("5124095576h").unwrap(),
            Duration::from_millis(5_124_095_576 * 3_600_000)
        );
    }

    #[test]
    fn test_parse_tags_skips_malformed() {
        let tags = parse_tags(&["line:3".into(), "broken".into(), "shift:night".into()]);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["line"], "3");
        assert_eq!(tags["shift"], "night");
    }

    #[test]
    fn test_pipeline_args_override_config() {
        let mut config = MonitorConfig::default();
        let args = PipelineArgs {
            model: Some(PathBuf::from("other.json")),
            window_seconds: Some(15),
            interval_ms: None,
            seed: Some(9),
            remote: None,
        };
        args.apply(&mut config);
        assert_eq!(config.model_path, PathBuf::from("other.json"));
        assert_eq!(config.window_seconds, 15);
        assert_eq!(config.sample_interval_ms, 1000);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(Some(0.91234)), "0.912");
        assert_eq!(format_confidence(None), "n/a");
    }
}
