//! Feature vector and its ordering contract.
//!
//! [`FEATURE_LAYOUT`] is the single source of truth for the order in which
//! features are handed to a classifier. Artifacts declare the names they were
//! trained on and are checked against this list once at load time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

use crate::error::{FieldIssue, FieldProblem, InferenceError};

/// Feature names in the exact order the classifier consumes them.
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "mean_vibration",
    "std_vibration",
    "temp_difference",
    "pressure_diff",
];

/// Number of features in the layout.
pub const FEATURE_COUNT: usize = 4;

/// Derived statistics over a window of readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub mean_vibration: f64,
    pub std_vibration: f64,
    pub temp_difference: f64,
    pub pressure_diff: f64,
}

impl FeatureVector {
    pub fn new(
        mean_vibration: f64,
        std_vibration: f64,
        temp_difference: f64,
        pressure_diff: f64,
    ) -> Self {
        Self {
            mean_vibration,
            std_vibration,
            temp_difference,
            pressure_diff,
        }
    }

    /// Values in [`FEATURE_LAYOUT`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.mean_vibration,
            self.std_vibration,
            self.temp_difference,
            self.pressure_diff,
        ]
    }

    /// Check every field is finite, reporting all offenders at once.
    pub fn validate(&self) -> Result<(), InferenceError> {
        let issues: Vec<FieldIssue> = FEATURE_LAYOUT
            .iter()
            .zip(self.to_array())
            .filter(|(_, v)| !v.is_finite())
            .map(|(&field, _)| FieldIssue {
                field,
                problem: FieldProblem::NonFinite,
            })
            .collect();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(InferenceError::InvalidFeatureVector { issues })
        }
    }

    /// Parse a prediction request body.
    ///
    /// Every layout field must be present and a finite JSON number. All
    /// problems are collected rather than stopping at the first one. Extra
    /// keys are ignored.
    pub fn from_json(body: &Value) -> Result<Self, InferenceError> {
        Self::collect(|field| match body.get(field) {
            None | Some(Value::Null) => Err(FieldProblem::Missing),
            Some(value) => check_number(value),
        })
    }

    /// Parse raw request bytes.
    ///
    /// Fields are judged one at a time, so a number too large for an `f64`
    /// is reported as non-finite under its own name while the other fields
    /// are still read. A body that is not a JSON object reports every field
    /// as missing.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, InferenceError> {
        if let Ok(value) = serde_json::from_slice::<Value>(body) {
            return Self::from_json(&value);
        }
        let raw: HashMap<String, Box<RawValue>> =
            serde_json::from_slice(body).unwrap_or_default();
        Self::collect(|field| match raw.get(field) {
            None => Err(FieldProblem::Missing),
            Some(text) => match serde_json::from_str::<Value>(text.get()) {
                Ok(Value::Null) => Err(FieldProblem::Missing),
                Ok(value) => check_number(&value),
                // Only numeric literals outside the f64 range fail here.
                Err(_) => Err(FieldProblem::NonFinite),
            },
        })
    }

    fn collect(
        mut lookup: impl FnMut(&'static str) -> Result<f64, FieldProblem>,
    ) -> Result<Self, InferenceError> {
        let mut values = [0.0; FEATURE_COUNT];
        let mut issues = Vec::new();

        for (slot, &field) in values.iter_mut().zip(FEATURE_LAYOUT.iter()) {
            match lookup(field) {
                Ok(v) => *slot = v,
                Err(problem) => issues.push(FieldIssue { field, problem }),
            }
        }

        if !issues.is_empty() {
            return Err(InferenceError::InvalidFeatureVector { issues });
        }
        let [mean_vibration, std_vibration, temp_difference, pressure_diff] = values;
        Ok(Self::new(
            mean_vibration,
            std_vibration,
            temp_difference,
            pressure_diff,
        ))
    }
}

fn check_number(value: &Value) -> Result<f64, FieldProblem> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(FieldProblem::NonFinite),
        },
        _ => Err(FieldProblem::NotNumeric),
    }
}

/// Layout description for API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutInfo {
    pub feature_count: usize,
    pub feature_names: Vec<&'static str>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.to_vec(),
        }
    }
}
