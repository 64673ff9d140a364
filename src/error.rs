//! Error types for artifact loading, input validation and inference

use crate::models::ArtifactKind;
use thiserror::Error;

/// Errors produced by the prediction core.
///
/// Every variant owns plain strings so the memoized load result can be
/// handed out again on each call without re-running the load.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictorError {
    /// Artifact source answered with a non-200 status
    #[error("Unable to load model: {url} returned HTTP {status}")]
    ArtifactFetch { url: String, status: u16 },

    /// Artifact request did not complete (DNS, TLS, timeout, local read)
    #[error("Unable to load model from {url}: {reason}")]
    ArtifactTransport { url: String, reason: String },

    /// Artifact bytes do not parse as the configured format
    #[error("Unable to load model: artifact is not a valid {kind} ({reason})")]
    ArtifactDeserialization { kind: ArtifactKind, reason: String },

    /// A field of the clinical input is outside its domain
    #[error("Invalid value for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The runtime failed while evaluating a feature vector
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl PredictorError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PredictorError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn deserialization(kind: ArtifactKind, reason: impl ToString) -> Self {
        PredictorError::ArtifactDeserialization {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Whether the error comes from acquiring or loading the artifact.
    ///
    /// These halt the service; the other variants only reject one request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PredictorError::ArtifactFetch { .. }
                | PredictorError::ArtifactTransport { .. }
                | PredictorError::ArtifactDeserialization { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PredictorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let fetch = PredictorError::ArtifactFetch {
            url: "https://example.org/model".to_string(),
            status: 404,
        };
        assert!(fetch.is_fatal());
        assert!(PredictorError::deserialization(ArtifactKind::InferenceGraph, "bad magic").is_fatal());
        assert!(!PredictorError::invalid("age", "out of range").is_fatal());
        assert!(!PredictorError::Inference("boom".to_string()).is_fatal());
    }

    #[test]
    fn test_fetch_message_mentions_status() {
        let err = PredictorError::ArtifactFetch {
            url: "https://example.org/model".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "Unable to load model: https://example.org/model returned HTTP 503"
        );
    }
}
