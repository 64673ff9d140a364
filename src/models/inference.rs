//! Classifier capability interface and the inference adapter

use crate::error::{PredictorError, Result};
use crate::feature_encoder::FeatureVector;
use crate::models::ArtifactKind;
use crate::types::verdict::Verdict;
use tracing::debug;

/// Raw output of a classifier for one feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class (0 = no disease, 1 = disease)
    pub label: i64,
    /// Probability of class 1, when the runtime provides one
    pub probability: Option<f64>,
}

/// A loaded model runtime.
///
/// `predict` is mandatory. Probability is an optional capability: runtimes
/// that have it override [`supports_probability`](Self::supports_probability)
/// and [`predict_proba`](Self::predict_proba).
pub trait Classifier: Send + Sync {
    /// Predicted class label
    fn predict(&self, features: &FeatureVector) -> Result<i64>;

    /// Probability of the positive class, `None` when unsupported
    fn predict_proba(&self, _features: &FeatureVector) -> Result<Option<f64>> {
        Ok(None)
    }

    fn supports_probability(&self) -> bool {
        false
    }

    /// Label and probability together.
    ///
    /// Runtimes that compute both in a single pass override this.
    fn evaluate(&self, features: &FeatureVector) -> Result<Prediction> {
        let label = self.predict(features)?;
        let probability = if self.supports_probability() {
            self.predict_proba(features)?
        } else {
            None
        };
        Ok(Prediction { label, probability })
    }
}

/// Uniform `classify` over any loaded artifact.
///
/// Owns the classifier handle; nothing else holds or mutates it.
pub struct InferenceAdapter {
    kind: ArtifactKind,
    classifier: Box<dyn Classifier>,
}

impl InferenceAdapter {
    pub fn new(kind: ArtifactKind, classifier: Box<dyn Classifier>) -> Self {
        Self { kind, classifier }
    }

    /// Format of the artifact behind this adapter
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn supports_probability(&self) -> bool {
        self.classifier.supports_probability()
    }

    /// Classify one feature vector into a verdict.
    pub fn classify(&self, features: &FeatureVector) -> Result<Verdict> {
        let prediction = self.classifier.evaluate(features)?;

        let positive = match prediction.label {
            1 => true,
            0 => false,
            other => {
                return Err(PredictorError::Inference(format!(
                    "model returned class {} for a binary task",
                    other
                )))
            }
        };

        let probability = match prediction.probability {
            Some(p) if self.supports_probability() => {
                if !(0.0..=1.0).contains(&p) {
                    return Err(PredictorError::Inference(format!(
                        "model returned probability {} outside [0, 1]",
                        p
                    )));
                }
                Some(p)
            }
            _ => None,
        };

        debug!(
            kind = %self.kind,
            positive = positive,
            probability = ?probability,
            "Classification complete"
        );

        Ok(Verdict {
            positive,
            probability,
        })
    }
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("kind", &self.kind)
            .field("supports_probability", &self.supports_probability())
            .finish()
    }
}
