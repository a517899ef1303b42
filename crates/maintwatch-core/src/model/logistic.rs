//! Logistic-regression artifacts: `score = sigmoid(w · x + b)`,
//! `label = score > threshold`.

use serde::Deserialize;

use crate::error::ArtifactError;
use crate::features::FEATURE_COUNT;

use super::{Classification, Classifier};

fn default_threshold() -> f64 {
    0.5
}

fn default_name() -> String {
    "logistic".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticClassifier {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticClassifier {
    pub fn new(name: impl Into<String>, weights: [f64; FEATURE_COUNT], bias: f64) -> Self {
        Self {
            name: name.into(),
            feature_names: super::layout_names(),
            weights: weights.to_vec(),
            bias,
            threshold: default_threshold(),
        }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(ArtifactError::Invalid(format!(
                "expected {FEATURE_COUNT} weights, found {}",
                self.weights.len()
            )));
        }
        if self.weights.iter().chain([&self.bias]).any(|w| !w.is_finite()) {
            return Err(ArtifactError::Invalid("non-finite weight or bias".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ArtifactError::Invalid(format!(
                "decision threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classify(&self, features: &[f64; FEATURE_COUNT]) -> Result<Classification, ArtifactError> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(ArtifactError::Evaluation(format!(
                "expected {FEATURE_COUNT} weights, found {}",
                self.weights.len()
            )));
        }
        let z: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        let score = 1.0 / (1.0 + (-z).exp());
        if !score.is_finite() {
            return Err(ArtifactError::Evaluation(format!("non-finite score for z={z}")));
        }
        Ok(Classification {
            label: score > self.threshold,
            score: Some(score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_logit_is_half() {
        let model = LogisticClassifier::new("flat", [0.0; FEATURE_COUNT], 0.0);
        let out = model.classify(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(out.score, Some(0.5));
        assert!(!out.label);
    }

    #[test]
    fn weights_follow_layout() {
        // Only temp_difference carries weight.
        let model = LogisticClassifier::new("temp", [0.0, 0.0, 1.0, 0.0], -10.0);
        assert!(model.classify(&[0.0, 0.0, 30.0, 0.0]).unwrap().label);
        assert!(!model.classify(&[30.0, 30.0, 0.0, 30.0]).unwrap().label);
    }

    #[test]
    fn validate_rejects_wrong_width() {
        let mut model = LogisticClassifier::new("w", [1.0; FEATURE_COUNT], 0.0);
        model.weights.pop();
        assert!(model.validate().is_err());
        assert!(model.classify(&[0.0; FEATURE_COUNT]).is_err());
    }

    #[test]
    fn validate_rejects_nan_bias() {
        let model = LogisticClassifier::new("nan", [1.0; FEATURE_COUNT], f64::NAN);
        assert!(model.validate().is_err());
    }
}
