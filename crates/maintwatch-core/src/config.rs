//! Monitor configuration.
//!
//! Layered: built-in defaults, then an optional JSON file, then
//! `MAINTWATCH_*` environment variables (a `.env` file is honoured), then
//! whatever the CLI overrides on the result.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MAINTWATCH_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Length of the rolling feature window.
    pub window_seconds: u64,
    /// Period between sensor polls.
    pub sample_interval_ms: u64,
    /// Classifier artifact to load at startup.
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Upper bound on one sensor poll or HTTP request.
    pub request_timeout_ms: u64,
    /// Points kept for dashboard plots.
    pub history_len: usize,
    /// Seed for the synthetic sampler. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            sample_interval_ms: 1000,
            model_path: PathBuf::from("models/maintenance_forest.json"),
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_ms: 2000,
            history_len: 120,
            seed: None,
        }
    }
}

impl MonitorConfig {
    /// Read a JSON config file. Keys it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env is normal.
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MAINTWATCH_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("WINDOW_SECONDS") {
            self.window_seconds = parse_value("WINDOW_SECONDS", &v)?;
        }
        if let Some(v) = var("SAMPLE_INTERVAL_MS") {
            self.sample_interval_ms = parse_value("SAMPLE_INTERVAL_MS", &v)?;
        }
        if let Some(v) = var("MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = var("HOST") {
            self.host = v;
        }
        if let Some(v) = var("PORT") {
            self.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_value("REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("HISTORY_LEN") {
            self.history_len = parse_value("HISTORY_LEN", &v)?;
        }
        if let Some(v) = var("SEED") {
            self.seed = Some(parse_value("SEED", &v)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_seconds == 0 {
            return Err(ConfigError::Invalid("window_seconds must be > 0".into()));
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sample_interval_ms must be > 0".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be > 0".into()));
        }
        if self.history_len == 0 {
            return Err(ConfigError::Invalid("history_len must be > 0".into()));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `host:port` for binding or connecting.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of a server running with this config.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind_addr())
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(config.sample_interval(), Duration::from_secs(1));
        assert_eq!(config.base_url(), "http://127.0.0.1:5000");
    }

    #[test]
    fn file_overrides_only_listed_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("monitor.json");
        std::fs::write(&path, r#"{"window_seconds": 30, "model_path": "m.json"}"#).unwrap();

        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.window_seconds, 30);
        assert_eq!(config.model_path, PathBuf::from("m.json"));
        assert_eq!(config.sample_interval_ms, 1000);
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MonitorConfig::from_file(Path::new("/nonexistent/monitor.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = MonitorConfig {
            window_seconds: 30,
            ..Default::default()
        };
        config
            .apply_env_from(env(&[
                ("MAINTWATCH_WINDOW_SECONDS", "10"),
                ("MAINTWATCH_PORT", "8081"),
                ("MAINTWATCH_SEED", "42"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();
        assert_eq!(config.window_seconds, 10);
        assert_eq!(config.port, 8081);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn unparsable_env_value_names_the_variable() {
        let mut config = MonitorConfig::default();
        let err = config
            .apply_env_from(env(&[("MAINTWATCH_SAMPLE_INTERVAL_MS", "fast")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "MAINTWATCH_SAMPLE_INTERVAL_MS");
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_window_and_interval() {
        let config = MonitorConfig {
            window_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            sample_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
