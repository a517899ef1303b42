//! Decision-tree ensemble (random forest) artifacts.
//!
//! Each tree is a flat node array rooted at index 0. A split sends the input
//! left when `x[feature] <= threshold`, right otherwise. Leaves carry the
//! probability of the positive class; the forest score is the mean over
//! trees and the label is `score > threshold` (0.5 by default).
//!
//! Child indices must point forward (`child > parent`), which rules out
//! cycles and bounds every walk by the tree size.

use serde::Deserialize;

use crate::error::ArtifactError;
use crate::features::FEATURE_COUNT;

use super::{Classification, Classifier};

fn default_threshold() -> f64 {
    0.5
}

fn default_name() -> String {
    "forest".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, tree_idx: usize) -> Result<(), ArtifactError> {
        let invalid = |node: usize, what: String| {
            ArtifactError::Invalid(format!("tree {tree_idx} node {node}: {what}"))
        };
        if self.nodes.is_empty() {
            return Err(ArtifactError::Invalid(format!("tree {tree_idx} has no nodes")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(invalid(i, format!("feature index {feature} out of range")));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(i, "non-finite threshold".into()));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(invalid(i, format!("bad child index {child}")));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(invalid(i, format!("leaf value {value} outside [0, 1]")));
                    }
                }
            }
        }
        Ok(())
    }

    /// Positive-class probability for one input.
    pub fn evaluate(&self, x: &[f64; FEATURE_COUNT]) -> Result<f64, ArtifactError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x.get(*feature).ok_or_else(|| {
                        ArtifactError::Evaluation(format!("feature index {feature} out of range"))
                    })?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(ArtifactError::Evaluation(format!(
                        "node index {idx} out of range"
                    )));
                }
            }
        }
    }
}

/// Tree-ensemble classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct ForestClassifier {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl ForestClassifier {
    pub fn new(name: impl Into<String>, trees: Vec<DecisionTree>) -> Self {
        Self {
            name: name.into(),
            feature_names: super::layout_names(),
            trees,
            threshold: default_threshold(),
        }
    }

    /// Structural validation; run before the artifact is used.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("forest has no trees".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ArtifactError::Invalid(format!(
                "decision threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classify(&self, features: &[f64; FEATURE_COUNT]) -> Result<Classification, ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Evaluation("forest has no trees".into()));
        }
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(features)?;
        }
        let score = total / self.trees.len() as f64;
        Ok(Classification {
            label: score > self.threshold,
            score: Some(score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: 0.0 },
                TreeNode::Leaf { value: 1.0 },
            ],
        }
    }

    #[test]
    fn averages_tree_votes() {
        let forest = ForestClassifier::new(
            "votes",
            vec![stump(0, 0.7), stump(1, 0.1), stump(2, 5.0), stump(3, 3.0)],
        );
        forest.validate().unwrap();

        // Only the vibration stump fires: 1/4.
        let out = forest.classify(&[0.75, 0.05, 1.0, 1.0]).unwrap();
        assert_eq!(out.score, Some(0.25));
        assert!(!out.label);

        // Three of four fire.
        let out = forest.classify(&[0.75, 0.2, 10.0, 1.0]).unwrap();
        assert_eq!(out.score, Some(0.75));
        assert!(out.label);
    }

    #[test]
    fn split_boundary_goes_left() {
        let forest = ForestClassifier::new("edge", vec![stump(0, 0.7)]);
        assert!(!forest.classify(&[0.7, 0.0, 0.0, 0.0]).unwrap().label);
    }

    #[test]
    fn tie_is_negative() {
        let forest = ForestClassifier::new("tie", vec![stump(0, 0.7), stump(1, 0.1)]);
        let out = forest.classify(&[0.9, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(out.score, Some(0.5));
        assert!(!out.label);
    }

    #[test]
    fn rejects_backward_child() {
        let forest = ForestClassifier::new(
            "cycle",
            vec![DecisionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 0,
                    },
                    TreeNode::Leaf { value: 0.0 },
                ],
            }],
        );
        assert!(matches!(forest.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_feature_and_leaf() {
        let bad_feature = ForestClassifier::new("f", vec![stump(4, 0.5)]);
        assert!(bad_feature.validate().is_err());

        let bad_leaf = ForestClassifier::new(
            "leaf",
            vec![DecisionTree {
                nodes: vec![TreeNode::Leaf { value: 1.2 }],
            }],
        );
        assert!(bad_leaf.validate().is_err());

        assert!(ForestClassifier::new("empty", vec![]).validate().is_err());
    }

    #[test]
    fn deserializes_untagged_nodes() {
        let json = r#"{
            "feature_names": ["mean_vibration", "std_vibration", "temp_difference", "pressure_diff"],
            "trees": [{"nodes": [
                {"feature": 2, "threshold": 1.5, "left": 1, "right": 2},
                {"value": 0.2},
                {"value": 0.8}
            ]}]
        }"#;
        let forest: ForestClassifier = serde_json::from_str(json).unwrap();
        assert_eq!(forest.name, "forest");
        assert_eq!(forest.threshold, 0.5);
        forest.validate().unwrap();
        assert_eq!(
            forest.classify(&[0.5, 0.0, 2.0, 0.0]).unwrap().score,
            Some(0.8)
        );
    }
}
