//! Assessment report handed to the presentation layer

use crate::feature_encoder::{FeatureVector, NamedFeature};
use crate::models::ArtifactKind;
use crate::types::clinical::ClinicalInput;
use crate::types::verdict::{RiskLabel, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Report published for every classified assessment
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    /// Unique report identifier
    pub assessment_id: String,

    /// Input exactly as submitted
    pub input: ClinicalInput,

    /// Encoded features, for the input summary
    pub features: Vec<NamedFeature>,

    pub verdict: Verdict,

    pub label: RiskLabel,

    /// Display text for the verdict
    pub message: String,

    /// Format of the artifact that produced the verdict
    pub model_kind: ArtifactKind,

    /// Report generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl AssessmentReport {
    /// Create a report for a classified input
    pub fn new(
        input: ClinicalInput,
        features: &FeatureVector,
        verdict: Verdict,
        model_kind: ArtifactKind,
    ) -> Self {
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            input,
            features: features.named(),
            label: verdict.label(),
            message: verdict.message(),
            verdict,
            model_kind,
            timestamp: Utc::now(),
        }
    }
}

/// Reply sent when a submission cannot be classified
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRejection {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl AssessmentRejection {
    pub fn new(reason: impl ToString) -> Self {
        Self {
            error: reason.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_encoder::FeatureEncoder;

    #[test]
    fn test_report_carries_input_features_and_verdict() {
        let input = ClinicalInput::default();
        let features = FeatureEncoder::new().encode(&input);
        let report = AssessmentReport::new(
            input.clone(),
            &features,
            Verdict::new(true, Some(0.87)),
            ArtifactKind::NativePipeline,
        );

        assert_eq!(report.input, input);
        assert_eq!(report.features.len(), 11);
        assert_eq!(report.label, RiskLabel::HighRisk);
        assert_eq!(report.message, "High Risk of Heart Disease - Probability: 0.87");
        assert!(uuid::Uuid::parse_str(&report.assessment_id).is_ok());
    }

    #[test]
    fn test_report_serialization() {
        let input = ClinicalInput::default();
        let features = FeatureEncoder::new().encode(&input);
        let report = AssessmentReport::new(
            input,
            &features,
            Verdict::new(false, None),
            ArtifactKind::InferenceGraph,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["label"], "normal");
        assert_eq!(json["model_kind"], "inference_graph");
        assert_eq!(json["features"][0]["name"], "age");
        assert_eq!(json["features"][0]["value"], 50.0);
        assert!(json["verdict"]["probability"].is_null());
    }
}
