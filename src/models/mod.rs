//! Model artifact acquisition and inference components

pub mod inference;
pub mod loader;
pub mod onnx;
pub mod pipeline;
pub mod source;

pub use inference::{Classifier, InferenceAdapter, Prediction};
pub use loader::{LazyAdapter, ModelLoader};
pub use source::{ArtifactSource, FileArtifactSource, HttpArtifactSource};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialization format of the model artifact, fixed per deployment.
///
/// Chosen once when the artifact is loaded; callers never branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// JSON pipeline document with a probabilistic estimator
    #[default]
    NativePipeline,
    /// ONNX inference graph run through ONNX Runtime
    InferenceGraph,
    /// bincode-encoded estimator; probability depends on the estimator
    GenericSerialized,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::NativePipeline => "native_pipeline",
            ArtifactKind::InferenceGraph => "inference_graph",
            ArtifactKind::GenericSerialized => "generic_serialized",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
