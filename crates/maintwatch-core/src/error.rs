//! Error taxonomy for the telemetry pipeline.
//!
//! Every ambiguous state is a distinct variant so that "we don't know" can
//! never be confused with "no maintenance needed" at any layer:
//!
//! - [`InsufficientData`]: the window is empty, poll again later.
//! - [`InferenceError::InvalidFeatureVector`]: caller error, not retried.
//! - [`InferenceError::ModelUnavailable`]: fatal until the artifact is reloaded.
//! - [`SensorUnavailable`]: transient upstream failure, retried by the caller.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// The upstream feed produced no reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sensor unavailable: {reason}")]
pub struct SensorUnavailable {
    pub reason: String,
}

impl SensorUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The feature window holds no readings yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("insufficient data: feature window is empty")]
pub struct InsufficientData;

/// What is wrong with a single feature field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    NotNumeric,
    NonFinite,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::NotNumeric => write!(f, "not numeric"),
            Self::NonFinite => write!(f, "not finite"),
        }
    }
}

/// A rejected feature field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.problem)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures of a prediction call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("invalid feature vector: {}", join_issues(.issues))]
    InvalidFeatureVector { issues: Vec<FieldIssue> },

    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },
}

impl InferenceError {
    /// Names of the offending fields, in layout order.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidFeatureVector { issues } => issues.iter().map(|i| i.field).collect(),
            Self::ModelUnavailable { .. } => Vec::new(),
        }
    }
}

/// Failures loading or checking a classifier artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed artifact: {0}")]
    Invalid(String),

    #[error("feature layout mismatch: expected {expected:?}, artifact declares {found:?}")]
    LayoutMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("startup self-check failed: {0}")]
    SelfCheck(String),

    #[error("artifact evaluation failed: {0}")]
    Evaluation(String),
}

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Session recording and loading failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("malformed readings.csv line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
