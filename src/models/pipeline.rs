//! Native estimator runtime for serialized pipeline artifacts.
//!
//! A [`Pipeline`] is a list of preprocessing steps followed by one binary
//! estimator. The same document is accepted as JSON
//! ([`ArtifactKind::NativePipeline`]) or bincode
//! ([`ArtifactKind::GenericSerialized`]).

use crate::error::{PredictorError, Result};
use crate::feature_encoder::{FeatureVector, FEATURE_COUNT};
use crate::models::inference::Classifier;
use crate::models::ArtifactKind;
use serde::{Deserialize, Serialize};

/// Preprocessing step applied before the estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `(x - mean) / scale`, a zero scale leaves the centered value unscaled
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
}

impl Transform {
    fn apply(&self, x: &mut [f64; FEATURE_COUNT]) {
        match self {
            Transform::StandardScaler { mean, scale } => {
                for (i, v) in x.iter_mut().enumerate() {
                    let s = if scale[i] == 0.0 { 1.0 } else { scale[i] };
                    *v = (*v - mean[i]) / s;
                }
            }
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Transform::StandardScaler { mean, scale } => {
                if mean.len() != FEATURE_COUNT || scale.len() != FEATURE_COUNT {
                    return Err(format!(
                        "standard_scaler expects {} means and scales, got {} and {}",
                        FEATURE_COUNT,
                        mean.len(),
                        scale.len()
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Decision tree node, addressed by index into [`DecisionTree::nodes`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample counts (or weights) reaching this leaf
    Leaf { value: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Normalized class distribution of the leaf `x` falls into.
    fn leaf_distribution(&self, x: &[f64]) -> Result<Vec<f64>> {
        let mut index = 0;
        // A well-formed tree reaches a leaf in at most `nodes.len()` steps
        for _ in 0..self.nodes.len() {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    return Ok(value.iter().map(|v| v / total).collect());
                }
            }
        }
        Err(PredictorError::Inference(
            "decision tree walk did not reach a leaf".to_string(),
        ))
    }

    fn validate(&self, n_classes: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!("node {} splits on unknown feature {}", i, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {} has a child out of bounds", i));
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} class values, expected {}",
                            i,
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|v| *v < 0.0) || value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {} has no positive class weight", i));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest: class probabilities are the mean of the per-tree leaf
/// distributions, the label is the most probable class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    fn class_probabilities(&self, x: &[f64]) -> Result<Vec<f64>> {
        let mut sum = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_distribution(x)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }
}

/// Linear decision function `w · x + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    fn decision(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x.iter())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }
}

/// Binary estimator at the end of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    RandomForest(TreeEnsemble),
    LogisticRegression(LinearModel),
    /// Exposes only a decision function, no probability
    LinearSvm(LinearModel),
}

impl Estimator {
    pub fn supports_probability(&self) -> bool {
        !matches!(self, Estimator::LinearSvm(_))
    }

    fn predict(&self, x: &[f64]) -> Result<i64> {
        match self {
            Estimator::RandomForest(forest) => {
                let proba = forest.class_probabilities(x)?;
                // First maximum wins, so ties resolve to class 0
                let mut best = 0;
                for (class, p) in proba.iter().enumerate() {
                    if *p > proba[best] {
                        best = class;
                    }
                }
                Ok(best as i64)
            }
            Estimator::LogisticRegression(model) | Estimator::LinearSvm(model) => {
                Ok(if model.decision(x) > 0.0 { 1 } else { 0 })
            }
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>> {
        match self {
            Estimator::RandomForest(forest) => Ok(Some(forest.class_probabilities(x)?[1])),
            Estimator::LogisticRegression(model) => {
                Ok(Some(1.0 / (1.0 + (-model.decision(x)).exp())))
            }
            Estimator::LinearSvm(_) => Ok(None),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Estimator::RandomForest(forest) => {
                if forest.n_classes != 2 {
                    return Err(format!(
                        "random_forest must be binary, found {} classes",
                        forest.n_classes
                    ));
                }
                if forest.trees.is_empty() {
                    return Err("random_forest has no trees".to_string());
                }
                for (i, tree) in forest.trees.iter().enumerate() {
                    tree.validate(forest.n_classes)
                        .map_err(|e| format!("tree {}: {}", i, e))?;
                }
                Ok(())
            }
            Estimator::LogisticRegression(model) | Estimator::LinearSvm(model) => {
                if model.coefficients.len() != FEATURE_COUNT {
                    return Err(format!(
                        "linear model expects {} coefficients, got {}",
                        FEATURE_COUNT,
                        model.coefficients.len()
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Preprocessing steps plus a binary estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub steps: Vec<Transform>,
    pub estimator: Estimator,
}

impl Pipeline {
    fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut x = features.as_f64();
        for step in &self.steps {
            step.apply(&mut x);
        }
        x
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for step in &self.steps {
            step.validate()?;
        }
        self.estimator.validate()
    }
}

/// [`Classifier`] backed by a deserialized [`Pipeline`]
#[derive(Debug)]
pub struct PipelineClassifier {
    pipeline: Pipeline,
}

impl PipelineClassifier {
    /// Load a JSON pipeline document.
    ///
    /// The estimator must expose class probabilities.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let kind = ArtifactKind::NativePipeline;
        let pipeline: Pipeline = serde_json::from_slice(bytes)
            .map_err(|e| PredictorError::deserialization(kind, e))?;

        if !pipeline.estimator.supports_probability() {
            return Err(PredictorError::deserialization(
                kind,
                "pipeline estimator does not expose predict_proba",
            ));
        }

        Self::checked(pipeline, kind)
    }

    /// Load a bincode-encoded pipeline.
    pub fn from_bincode(bytes: &[u8]) -> Result<Self> {
        let kind = ArtifactKind::GenericSerialized;
        let pipeline: Pipeline =
            bincode::deserialize(bytes).map_err(|e| PredictorError::deserialization(kind, e))?;

        Self::checked(pipeline, kind)
    }

    fn checked(pipeline: Pipeline, kind: ArtifactKind) -> Result<Self> {
        pipeline
            .validate()
            .map_err(|e| PredictorError::deserialization(kind, e))?;
        Ok(Self { pipeline })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl Classifier for PipelineClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        self.pipeline.estimator.predict(&self.pipeline.transform(features))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Option<f64>> {
        self.pipeline
            .estimator
            .predict_proba(&self.pipeline.transform(features))
    }

    fn supports_probability(&self) -> bool {
        self.pipeline.estimator.supports_probability()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::feature_encoder::FeatureEncoder;
    use crate::types::clinical::{ChestPainType, ClinicalInput, StSlope};

    /// Two stumps: one on chest pain type (index 2), one on ST slope (index 10).
    pub(crate) fn stump_forest() -> Pipeline {
        Pipeline {
            steps: Vec::new(),
            estimator: Estimator::RandomForest(TreeEnsemble {
                n_classes: 2,
                trees: vec![
                    DecisionTree {
                        nodes: vec![
                            TreeNode::Split {
                                feature: 2,
                                threshold: 3.5,
                                left: 1,
                                right: 2,
                            },
                            TreeNode::Leaf {
                                value: vec![80.0, 20.0],
                            },
                            TreeNode::Leaf {
                                value: vec![10.0, 90.0],
                            },
                        ],
                    },
                    DecisionTree {
                        nodes: vec![
                            TreeNode::Split {
                                feature: 10,
                                threshold: 1.5,
                                left: 1,
                                right: 2,
                            },
                            TreeNode::Leaf {
                                value: vec![0.7, 0.3],
                            },
                            TreeNode::Leaf {
                                value: vec![0.2, 0.8],
                            },
                        ],
                    },
                ],
            }),
        }
    }

    fn encode(input: &ClinicalInput) -> FeatureVector {
        FeatureEncoder::new().encode(input)
    }

    #[test]
    fn test_forest_probability_is_tree_mean() {
        let json = serde_json::to_vec(&stump_forest()).unwrap();
        let classifier = PipelineClassifier::from_json(&json).unwrap();

        let low = encode(&ClinicalInput::default());
        assert_eq!(classifier.predict(&low).unwrap(), 0);
        let p = classifier.predict_proba(&low).unwrap().unwrap();
        assert!((p - 0.25).abs() < 1e-9);

        let high = encode(&ClinicalInput {
            chest_pain_type: ChestPainType::Asymptomatic,
            st_slope: StSlope::Flat,
            ..ClinicalInput::default()
        });
        assert_eq!(classifier.predict(&high).unwrap(), 1);
        let p = classifier.predict_proba(&high).unwrap().unwrap();
        assert!((p - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_logistic_regression_with_scaler() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[0] = 1.0; // age
        let pipeline = Pipeline {
            steps: vec![Transform::StandardScaler {
                mean: {
                    let mut m = vec![0.0; FEATURE_COUNT];
                    m[0] = 50.0;
                    m
                },
                scale: {
                    let mut s = vec![1.0; FEATURE_COUNT];
                    s[0] = 10.0;
                    s[1] = 0.0;
                    s
                },
            }],
            estimator: Estimator::LogisticRegression(LinearModel {
                coefficients,
                intercept: 0.0,
            }),
        };
        let classifier =
            PipelineClassifier::from_json(&serde_json::to_vec(&pipeline).unwrap()).unwrap();

        // age 50 sits on the mean: decision 0, probability 0.5, label 0
        let at_mean = encode(&ClinicalInput::default());
        assert_eq!(classifier.predict(&at_mean).unwrap(), 0);
        assert!((classifier.predict_proba(&at_mean).unwrap().unwrap() - 0.5).abs() < 1e-9);

        let older = encode(&ClinicalInput {
            age: 70,
            ..ClinicalInput::default()
        });
        assert_eq!(classifier.predict(&older).unwrap(), 1);
        let expected = 1.0 / (1.0 + (-2.0_f64).exp());
        assert!((classifier.predict_proba(&older).unwrap().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_json_pipeline_requires_probability() {
        let pipeline = Pipeline {
            steps: Vec::new(),
            estimator: Estimator::LinearSvm(LinearModel {
                coefficients: vec![0.1; FEATURE_COUNT],
                intercept: -1.0,
            }),
        };

        let err = PipelineClassifier::from_json(&serde_json::to_vec(&pipeline).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            PredictorError::ArtifactDeserialization {
                kind: ArtifactKind::NativePipeline,
                ..
            }
        ));
    }

    #[test]
    fn test_bincode_svm_has_no_probability() {
        let pipeline = Pipeline {
            steps: Vec::new(),
            estimator: Estimator::LinearSvm(LinearModel {
                coefficients: vec![0.01; FEATURE_COUNT],
                intercept: -6.0,
            }),
        };
        let classifier =
            PipelineClassifier::from_bincode(&bincode::serialize(&pipeline).unwrap()).unwrap();

        assert!(!classifier.supports_probability());
        let features = encode(&ClinicalInput::default());
        // 0.01 * (50+0+1+120+200+0+0+150+0+1+1) - 6 = -0.77
        assert_eq!(classifier.predict(&features).unwrap(), 0);
        assert_eq!(classifier.predict_proba(&features).unwrap(), None);
    }

    #[test]
    fn test_bincode_forest_keeps_probability() {
        let bytes = bincode::serialize(&stump_forest()).unwrap();
        let classifier = PipelineClassifier::from_bincode(&bytes).unwrap();
        assert!(classifier.supports_probability());
    }

    #[test]
    fn test_garbage_bytes_fail_to_load() {
        assert!(matches!(
            PipelineClassifier::from_json(b"<html>quota exceeded</html>"),
            Err(PredictorError::ArtifactDeserialization { .. })
        ));
        assert!(matches!(
            PipelineClassifier::from_bincode(&[0xff, 0x01]),
            Err(PredictorError::ArtifactDeserialization { .. })
        ));
    }

    #[test]
    fn test_malformed_tree_is_rejected() {
        let mut pipeline = stump_forest();
        if let Estimator::RandomForest(forest) = &mut pipeline.estimator {
            forest.trees[0].nodes[0] = TreeNode::Split {
                feature: 2,
                threshold: 3.5,
                left: 1,
                right: 7,
            };
        }

        let err = PipelineClassifier::from_json(&serde_json::to_vec(&pipeline).unwrap()).unwrap_err();
        assert!(err.to_string().contains("child out of bounds"));
    }

    #[test]
    fn test_cyclic_tree_errors_at_inference() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 100.0,
                    left: 1,
                    right: 1,
                },
                TreeNode::Split {
                    feature: 0,
                    threshold: 100.0,
                    left: 0,
                    right: 0,
                },
            ],
        };
        let x = [0.0; FEATURE_COUNT];
        assert!(matches!(
            tree.leaf_distribution(&x),
            Err(PredictorError::Inference(_))
        ));
    }

    #[test]
    fn test_json_document_shape() {
        let json = r#"{
            "estimator": {
                "random_forest": {
                    "n_classes": 2,
                    "trees": [
                        { "nodes": [ { "leaf": { "value": [1.0, 3.0] } } ] }
                    ]
                }
            }
        }"#;

        let classifier = PipelineClassifier::from_json(json.as_bytes()).unwrap();
        let features = encode(&ClinicalInput::default());
        assert_eq!(classifier.predict(&features).unwrap(), 1);
        assert_eq!(classifier.predict_proba(&features).unwrap(), Some(0.75));
    }
}
