//! RemoteSampler: real-feed adapter that fetches readings from an HTTP
//! endpoint serving `{"timestamp", "vibration", "temperature", "pressure"}`.
//!
//! Every request is bounded by a timeout. Transport errors, non-2xx
//! statuses, undecodable bodies and non-finite channels all surface as
//! [`SensorUnavailable`]; the adapter never retries and never fabricates a
//! reading.

use std::time::Duration;

use crate::error::SensorUnavailable;
use crate::reading::Reading;
use crate::sampler::{SamplerInfo, SamplerKind, SensorSampler};

static REMOTE_INFO: SamplerInfo = SamplerInfo {
    name: "remote",
    description: "Fetches readings from a remote telemetry endpoint over HTTP",
    kind: SamplerKind::Remote,
};

pub struct RemoteSampler {
    url: String,
    agent: ureq::Agent,
}

impl RemoteSampler {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SensorSampler for RemoteSampler {
    fn info(&self) -> &SamplerInfo {
        &REMOTE_INFO
    }

    fn is_available(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }

    fn sample(&self) -> Result<Reading, SensorUnavailable> {
        let response = match self.agent.get(&self.url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(SensorUnavailable::new(format!(
                    "{} returned HTTP {code}",
                    self.url
                )));
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(SensorUnavailable::new(format!("{}: {t}", self.url)));
            }
        };

        let reading: Reading = response
            .into_json()
            .map_err(|e| SensorUnavailable::new(format!("undecodable reading: {e}")))?;

        if let Some(channel) = reading.non_finite_channel() {
            return Err(SensorUnavailable::new(format!(
                "feed sent non-finite {channel}"
            )));
        }
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serve exactly one canned HTTP response on an ephemeral port.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/sensor-data")
    }

    #[test]
    fn decodes_reading() {
        let url = serve_once(
            "200 OK",
            r#"{"timestamp":"2024-05-01T08:00:00Z","vibration":0.61,"temperature":72.5,"pressure":29.9}"#,
        );
        let sampler = RemoteSampler::new(url, Duration::from_secs(2));
        let r = sampler.sample().unwrap();
        assert_eq!(r.vibration, 0.61);
        assert_eq!(r.temperature, 72.5);
        assert_eq!(r.pressure, 29.9);
    }

    #[test]
    fn error_status_is_unavailable() {
        let url = serve_once("503 Service Unavailable", r#"{"error":"sensor_unavailable"}"#);
        let sampler = RemoteSampler::new(url, Duration::from_secs(2));
        let err = sampler.sample().unwrap_err();
        assert!(err.reason.contains("503"), "{}", err.reason);
    }

    #[test]
    fn malformed_body_is_unavailable() {
        let url = serve_once("200 OK", r#"{"vibration":"high"}"#);
        let sampler = RemoteSampler::new(url, Duration::from_secs(2));
        let err = sampler.sample().unwrap_err();
        assert!(err.reason.starts_with("undecodable reading"), "{}", err.reason);
    }

    #[test]
    fn unreachable_feed_is_unavailable() {
        // Bind then drop to get a port with nothing listening.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let sampler = RemoteSampler::new(
            format!("http://127.0.0.1:{port}/sensor-data"),
            Duration::from_millis(300),
        );
        assert!(sampler.sample().is_err());
    }
}
