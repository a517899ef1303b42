//! Classifier artifacts.
//!
//! An artifact is an opaque, externally trained classifier with a fixed
//! feature contract: a 4-element vector in [`FEATURE_LAYOUT`] order in, a
//! binary label (and optionally a score) out. Artifacts are loaded once,
//! checked once, and then shared read-only behind an `Arc`.
//!
//! # File format
//!
//! Artifacts are JSON documents tagged by `kind`:
//!
//! ```json
//! { "kind": "forest", "name": "rf-v3",
//!   "feature_names": ["mean_vibration", "std_vibration", "temp_difference", "pressure_diff"],
//!   "trees": [ { "nodes": [ {"feature": 0, "threshold": 0.7, "left": 1, "right": 2},
//!                           {"value": 0.1}, {"value": 0.9} ] } ] }
//! ```
//!
//! See [`forest`], [`logistic`] and [`constant`] for each kind.

pub mod constant;
pub mod forest;
pub mod logistic;

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ArtifactError;
use crate::features::{FEATURE_COUNT, FEATURE_LAYOUT};

pub use constant::ConstantClassifier;
pub use forest::{DecisionTree, ForestClassifier, TreeNode};
pub use logistic::LogisticClassifier;

/// Vector used by the load-time self-check. Sits inside the envelope of a
/// healthy machine so every artifact kind can evaluate it.
pub const PROBE_VECTOR: [f64; FEATURE_COUNT] = [0.6, 0.05, 1.0, 0.75];

/// Output of a single classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: bool,
    /// Probability of the positive class, if the artifact exposes one.
    pub score: Option<f64>,
}

/// Trait that every classifier artifact must implement.
pub trait Classifier: Send + Sync {
    /// Artifact identifier, for status reporting.
    fn name(&self) -> &str;

    /// Feature names the artifact was trained on, in its input order.
    fn feature_names(&self) -> &[String];

    /// Classify one feature vector given in [`FEATURE_LAYOUT`] order.
    fn classify(&self, features: &[f64; FEATURE_COUNT]) -> Result<Classification, ArtifactError>;
}

/// On-disk artifact document.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactDocument {
    Forest(forest::ForestClassifier),
    Logistic(logistic::LogisticClassifier),
    Constant(constant::ConstantClassifier),
}

impl ArtifactDocument {
    /// Validate the document's structure and box it as a classifier.
    pub fn into_classifier(self) -> Result<Arc<dyn Classifier>, ArtifactError> {
        Ok(match self {
            Self::Forest(f) => {
                f.validate()?;
                Arc::new(f)
            }
            Self::Logistic(l) => {
                l.validate()?;
                Arc::new(l)
            }
            Self::Constant(c) => Arc::new(c),
        })
    }
}

/// Parse, validate and self-check an artifact from a JSON string.
pub fn artifact_from_json(json: &str) -> Result<Arc<dyn Classifier>, ArtifactError> {
    let doc: ArtifactDocument = serde_json::from_str(json)?;
    let classifier = doc.into_classifier()?;
    self_check(classifier.as_ref())?;
    Ok(classifier)
}

/// Load, validate and self-check an artifact file.
///
/// Any failure here is meant to abort startup rather than surface on the
/// first request.
pub fn load_artifact(path: &Path) -> Result<Arc<dyn Classifier>, ArtifactError> {
    log::info!("loading classifier artifact from {}", path.display());
    let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let classifier = artifact_from_json(&json)?;
    log::info!(
        "artifact '{}' loaded and passed self-check",
        classifier.name()
    );
    Ok(classifier)
}

/// Verify the artifact's feature order and that it evaluates a probe vector.
pub fn self_check(classifier: &dyn Classifier) -> Result<Classification, ArtifactError> {
    let declared = classifier.feature_names();
    if declared.len() != FEATURE_COUNT
        || declared
            .iter()
            .zip(FEATURE_LAYOUT.iter())
            .any(|(found, expected)| found != expected)
    {
        log::warn!(
            "artifact '{}' declares features {declared:?}",
            classifier.name()
        );
        return Err(ArtifactError::LayoutMismatch {
            expected: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
            found: declared.to_vec(),
        });
    }

    let probe = classifier
        .classify(&PROBE_VECTOR)
        .map_err(|e| ArtifactError::SelfCheck(format!("probe vector rejected: {e}")))?;
    match probe.score {
        Some(score) if !(0.0..=1.0).contains(&score) => Err(ArtifactError::SelfCheck(format!(
            "probe score {score} outside [0, 1]"
        ))),
        _ => Ok(probe),
    }
}

/// Default feature names, for artifacts built in code.
pub(crate) fn layout_names() -> Vec<String> {
    FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOREST: &str = r#"{
        "kind": "forest",
        "name": "test-forest",
        "feature_names": ["mean_vibration", "std_vibration", "temp_difference", "pressure_diff"],
        "trees": [
            {"nodes": [
                {"feature": 0, "threshold": 0.7, "left": 1, "right": 2},
                {"value": 0.0},
                {"value": 1.0}
            ]}
        ]
    }"#;

    #[test]
    fn loads_forest_from_json() {
        let c = artifact_from_json(FOREST).unwrap();
        assert_eq!(c.name(), "test-forest");
        let out = c.classify(&[0.9, 0.0, 0.0, 0.0]).unwrap();
        assert!(out.label);
        assert_eq!(out.score, Some(1.0));
    }

    #[test]
    fn rejects_reordered_layout() {
        let json = FOREST.replace(
            r#"["mean_vibration", "std_vibration", "temp_difference", "pressure_diff"]"#,
            r#"["std_vibration", "mean_vibration", "temp_difference", "pressure_diff"]"#,
        );
        match artifact_from_json(&json) {
            Err(ArtifactError::LayoutMismatch { found, .. }) => {
                assert_eq!(found[0], "std_vibration");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("reordered layout accepted"),
        }
    }

    #[test]
    fn rejects_short_layout() {
        let json = r#"{"kind": "constant", "label": false, "feature_names": ["mean_vibration"]}"#;
        assert!(matches!(
            artifact_from_json(json),
            Err(ArtifactError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let json = r#"{"kind": "svm", "feature_names": []}"#;
        assert!(matches!(
            artifact_from_json(json),
            Err(ArtifactError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_artifact(Path::new("/nonexistent/model.json"))
            .err()
            .unwrap();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    struct BrokenClassifier(Vec<String>);

    impl Classifier for BrokenClassifier {
        fn name(&self) -> &str {
            "broken"
        }
        fn feature_names(&self) -> &[String] {
            &self.0
        }
        fn classify(&self, _: &[f64; FEATURE_COUNT]) -> Result<Classification, ArtifactError> {
            Err(ArtifactError::Evaluation("weights missing".into()))
        }
    }

    #[test]
    fn self_check_fails_when_probe_fails() {
        let err = self_check(&BrokenClassifier(layout_names())).unwrap_err();
        assert!(matches!(err, ArtifactError::SelfCheck(_)));
        assert!(err.to_string().contains("weights missing"));
    }

    struct OutOfRangeScore(Vec<String>);

    impl Classifier for OutOfRangeScore {
        fn name(&self) -> &str {
            "out-of-range"
        }
        fn feature_names(&self) -> &[String] {
            &self.0
        }
        fn classify(&self, _: &[f64; FEATURE_COUNT]) -> Result<Classification, ArtifactError> {
            Ok(Classification {
                label: true,
                score: Some(1.5),
            })
        }
    }

    #[test]
    fn self_check_rejects_score_outside_unit_interval() {
        assert!(matches!(
            self_check(&OutOfRangeScore(layout_names())),
            Err(ArtifactError::SelfCheck(_))
        ));
    }
}
