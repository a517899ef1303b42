//! Fixed-label artifact. Exposes no score. Useful as a stub when wiring the
//! pipeline before a trained artifact exists.

use serde::Deserialize;

use crate::error::ArtifactError;
use crate::features::FEATURE_COUNT;

use super::{Classification, Classifier};

fn default_name() -> String {
    "constant".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantClassifier {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub label: bool,
}

impl ConstantClassifier {
    pub fn new(label: bool) -> Self {
        Self {
            name: default_name(),
            feature_names: super::layout_names(),
            label,
        }
    }
}

impl Classifier for ConstantClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classify(&self, _features: &[f64; FEATURE_COUNT]) -> Result<Classification, ArtifactError> {
        Ok(Classification {
            label: self.label,
            score: None,
        })
    }
}
