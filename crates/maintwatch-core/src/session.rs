//! Session recording for offline analysis and replay.
//!
//! Records timestamped readings from a sampler together with session
//! metadata. Recorded sessions can be loaded back and replayed through the
//! pipeline with [`crate::samplers::ReplaySampler`].
//!
//! # Storage Format
//!
//! Each session is a directory containing:
//! - `session.json`: metadata (sampler, timing, machine info, tags)
//! - `readings.csv`: `timestamp,vibration,temperature,pressure` rows with
//!   RFC 3339 timestamps

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::reading::Reading;

const READINGS_HEADER: &str = "timestamp,vibration,temperature,pressure";

// ---------------------------------------------------------------------------
// Machine info
// ---------------------------------------------------------------------------

/// Host information captured at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
}

/// Detect host information (best-effort).
pub fn detect_machine_info() -> MachineInfo {
    MachineInfo {
        hostname: hostname().unwrap_or_else(|| "unknown".to_string()),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

fn hostname() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/hostname")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
    #[cfg(not(target_os = "linux"))]
    {
        std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Session metadata (session.json)
// ---------------------------------------------------------------------------

/// Session metadata written to session.json at the end of recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub version: u32,
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub sampler: String,
    pub interval_ms: Option<u64>,
    pub total_readings: u64,
    pub machine: MachineInfo,
    pub tags: HashMap<String, String>,
    pub note: Option<String>,
    pub maintwatch_version: String,
}

// ---------------------------------------------------------------------------
// Session config
// ---------------------------------------------------------------------------

/// Configuration for a recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sampler: String,
    pub interval: Option<Duration>,
    pub output_dir: PathBuf,
    pub tags: HashMap<String, String>,
    pub note: Option<String>,
    pub duration: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampler: "synthetic".to_string(),
            interval: None,
            output_dir: PathBuf::from("sessions"),
            tags: HashMap::new(),
            note: None,
            duration: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session writer
// ---------------------------------------------------------------------------

/// Handles incremental file I/O for a recording session.
pub struct SessionWriter {
    session_dir: PathBuf,
    csv_writer: BufWriter<File>,
    total_readings: u64,
    started_at: DateTime<Utc>,
    started_instant: Instant,
    session_id: String,
    config: SessionConfig,
    machine: MachineInfo,
}

impl SessionWriter {
    /// Create a new session writer, creating the session directory and files.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let machine = detect_machine_info();
        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        // {compact timestamp}-{sampler}-{short id}
        let dir_name = format!(
            "{}-{}-{}",
            started_at.format("%Y-%m-%dT%H%M%SZ"),
            config.sampler,
            &session_id[..8]
        );
        let session_dir = config.output_dir.join(&dir_name);
        fs::create_dir_all(&session_dir)?;

        let csv_file = File::create(session_dir.join("readings.csv"))?;
        let mut csv_writer = BufWriter::new(csv_file);
        writeln!(csv_writer, "{READINGS_HEADER}")?;
        csv_writer.flush()?;

        Ok(Self {
            session_dir,
            csv_writer,
            total_readings: 0,
            started_at,
            started_instant: Instant::now(),
            session_id,
            config,
            machine,
        })
    }

    /// Append one reading.
    pub fn write_reading(&mut self, reading: &Reading) -> Result<(), SessionError> {
        writeln!(
            self.csv_writer,
            "{},{},{},{}",
            reading.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            reading.vibration,
            reading.temperature,
            reading.pressure
        )?;
        self.csv_writer.flush()?;
        self.total_readings += 1;
        Ok(())
    }

    /// Finalize the session, writing session.json. Call this on graceful shutdown.
    pub fn finish(mut self) -> Result<PathBuf, SessionError> {
        self.csv_writer.flush()?;

        let meta = SessionMeta {
            version: 1,
            id: self.session_id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            duration_ms: self.started_instant.elapsed().as_millis() as u64,
            sampler: self.config.sampler.clone(),
            interval_ms: self.config.interval.map(|d| d.as_millis() as u64),
            total_readings: self.total_readings,
            machine: self.machine,
            tags: self.config.tags.clone(),
            note: self.config.note.clone(),
            maintwatch_version: crate::VERSION.to_string(),
        };

        let json = serde_json::to_string_pretty(&meta)?;
        fs::write(self.session_dir.join("session.json"), json)?;
        Ok(self.session_dir)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn total_readings(&self) -> u64 {
        self.total_readings
    }

    pub fn elapsed(&self) -> Duration {
        self.started_instant.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read a session's metadata.
pub fn load_session_meta(session_dir: &Path) -> Result<SessionMeta, SessionError> {
    let json = fs::read_to_string(session_dir.join("session.json"))?;
    Ok(serde_json::from_str(&json)?)
}

/// Read a session's readings in recorded order.
///
/// A session whose recorder was killed may have no session.json; its
/// readings are still loadable.
pub fn load_session_readings(session_dir: &Path) -> Result<Vec<Reading>, SessionError> {
    let file = File::open(session_dir.join("readings.csv"))?;
    let mut readings = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if idx == 0 && line.trim() == READINGS_HEADER {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        readings.push(parse_reading_line(&line).map_err(|reason| SessionError::Malformed {
            line: line_no,
            reason,
        })?);
    }
    Ok(readings)
}

fn parse_reading_line(line: &str) -> Result<Reading, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }
    let timestamp = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| format!("bad timestamp {:?}: {e}", fields[0]))?
        .with_timezone(&Utc);
    let number = |i: usize| -> Result<f64, String> {
        fields[i]
            .parse::<f64>()
            .map_err(|e| format!("bad number {:?}: {e}", fields[i]))
    };
    Ok(Reading::new(timestamp, number(1)?, number(2)?, number(3)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_detect_machine_info() {
        let info = detect_machine_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(!info.hostname.is_empty());
    }

    #[test]
    fn test_session_writer_creates_directory_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            output_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };

        let writer = SessionWriter::new(config).unwrap();
        let dir = writer.session_dir().to_path_buf();
        assert!(dir.exists());
        assert!(dir.join("readings.csv").exists());
        assert!(dir.file_name().unwrap().to_string_lossy().contains("synthetic"));

        let result_dir = writer.finish().unwrap();
        assert!(result_dir.join("session.json").exists());
    }

    #[test]
    fn test_session_writer_writes_valid_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            sampler: "replay".to_string(),
            interval: Some(Duration::from_millis(250)),
            output_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };

        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut writer = SessionWriter::new(config).unwrap();
        writer
            .write_reading(&Reading::new(t0, 0.5, 60.0, 30.0))
            .unwrap();
        writer
            .write_reading(&Reading::new(t0 + TimeDelta::milliseconds(250), 0.625, 61.5, 29.75))
            .unwrap();
        assert_eq!(writer.total_readings(), 2);

        let dir = writer.finish().unwrap();
        let csv = std::fs::read_to_string(dir.join("readings.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], READINGS_HEADER);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "2024-05-01T08:00:00.000000Z,0.5,60,30");

        let meta = load_session_meta(&dir).unwrap();
        assert_eq!(meta.version, 1);
        assert_eq!(meta.total_readings, 2);
        assert_eq!(meta.sampler, "replay");
        assert_eq!(meta.interval_ms, Some(250));
    }

    #[test]
    fn test_session_readings_load_back() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            output_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let recorded: Vec<Reading> = (0..5)
            .map(|i| {
                Reading::new(
                    t0 + TimeDelta::milliseconds(i * 333),
                    0.4 + i as f64 * 0.01,
                    55.5 + i as f64,
                    30.125,
                )
            })
            .collect();

        let mut writer = SessionWriter::new(config).unwrap();
        for r in &recorded {
            writer.write_reading(r).unwrap();
        }
        let dir = writer.finish().unwrap();

        assert_eq!(load_session_readings(&dir).unwrap(), recorded);
    }

    #[test]
    fn test_session_with_tags_and_note() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tags = HashMap::new();
        tags.insert("machine".to_string(), "press-7".to_string());
        let config = SessionConfig {
            output_dir: tmp.path().to_path_buf(),
            tags,
            note: Some("after bearing swap".to_string()),
            ..Default::default()
        };
        let dir = SessionWriter::new(config).unwrap().finish().unwrap();
        let meta = load_session_meta(&dir).unwrap();
        assert_eq!(meta.tags.get("machine").unwrap(), "press-7");
        assert_eq!(meta.note.unwrap(), "after bearing swap");
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("readings.csv"),
            format!("{READINGS_HEADER}\n2024-05-01T08:00:00Z,0.5,60,30\n2024-05-01T08:00:01Z,loud,60,30\n"),
        )
        .unwrap();
        match load_session_readings(tmp.path()) {
            Err(SessionError::Malformed { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("loud"), "{reason}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
