//! Artifact loading and process-wide memoization

use crate::error::{PredictorError, Result};
use crate::feature_encoder::FeatureVector;
use crate::models::inference::{Classifier, InferenceAdapter};
use crate::models::onnx::OnnxClassifier;
use crate::models::pipeline::PipelineClassifier;
use crate::models::source::ArtifactSource;
use crate::models::ArtifactKind;
use crate::types::verdict::Verdict;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{error, info};

/// Turns artifact bytes into an [`InferenceAdapter`] for a given format
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Deserialize `bytes` with the strategy selected by `kind`.
    pub fn load(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<InferenceAdapter> {
        let classifier: Box<dyn Classifier> = match kind {
            ArtifactKind::NativePipeline => Box::new(PipelineClassifier::from_json(bytes)?),
            ArtifactKind::InferenceGraph => {
                Box::new(OnnxClassifier::from_bytes(bytes, self.onnx_threads)?)
            }
            ArtifactKind::GenericSerialized => Box::new(PipelineClassifier::from_bincode(bytes)?),
        };

        let adapter = InferenceAdapter::new(kind, classifier);
        info!(
            kind = %kind,
            size = bytes.len(),
            probability = adapter.supports_probability(),
            "Model loaded successfully"
        );

        Ok(adapter)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Inference adapter that fetches and loads its artifact on first use.
///
/// The outcome of the first load, success or failure, is kept for the
/// lifetime of the value: the source is hit at most once, concurrent first
/// callers wait for the same load, and a failed load is never retried.
pub struct LazyAdapter {
    url: String,
    kind: ArtifactKind,
    source: Box<dyn ArtifactSource>,
    loader: ModelLoader,
    adapter: OnceLock<Result<InferenceAdapter>>,
}

impl LazyAdapter {
    pub fn new(
        url: impl Into<String>,
        kind: ArtifactKind,
        source: Box<dyn ArtifactSource>,
        loader: ModelLoader,
    ) -> Self {
        Self {
            url: url.into(),
            kind,
            source,
            loader,
            adapter: OnceLock::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Whether a load has succeeded
    pub fn is_loaded(&self) -> bool {
        matches!(self.adapter.get(), Some(Ok(_)))
    }

    /// The loaded adapter, fetching and loading it on the first call.
    ///
    /// This blocks on network I/O the first time; async callers should run
    /// it on a blocking thread.
    pub fn get(&self) -> Result<&InferenceAdapter> {
        self.adapter
            .get_or_init(|| self.fetch_and_load())
            .as_ref()
            .map_err(PredictorError::clone)
    }

    /// Classify through the memoized adapter.
    ///
    /// A load failure short-circuits before any classification.
    pub fn classify(&self, features: &FeatureVector) -> Result<Verdict> {
        self.get()?.classify(features)
    }

    fn fetch_and_load(&self) -> Result<InferenceAdapter> {
        let start = Instant::now();

        let result = self
            .source
            .fetch(&self.url)
            .and_then(|bytes| self.loader.load(self.kind, &bytes));

        match &result {
            Ok(_) => info!(
                url = %self.url,
                kind = %self.kind,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Model artifact ready"
            ),
            Err(e) => error!(url = %self.url, kind = %self.kind, error = %e, "Model artifact load failed"),
        }

        result
    }
}
