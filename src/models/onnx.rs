//! ONNX inference graph classifier

use crate::error::{PredictorError, Result};
use crate::feature_encoder::{FeatureVector, FEATURE_COUNT};
use crate::models::inference::{Classifier, Prediction};
use crate::models::ArtifactKind;
use anyhow::Context;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier running an ONNX graph through ONNX Runtime.
///
/// Probability support is discovered from the graph outputs: converters that
/// emit a `probabilities` output (tensor or `seq(map(int64, float))`) get it,
/// label-only graphs do not.
pub struct OnnxClassifier {
    /// Running a session needs `&mut`, so it is serialized here
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output holding the predicted class
    label_output: Option<String>,
    /// Output holding per-class probabilities
    probability_output: Option<String>,
}

impl OnnxClassifier {
    /// Deserialize an ONNX graph held in memory.
    pub fn from_bytes(bytes: &[u8], onnx_threads: usize) -> Result<Self> {
        let session = build_session(bytes, onnx_threads)
            .map_err(|e| PredictorError::deserialization(ArtifactKind::InferenceGraph, format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_output.is_none() && probability_output.is_none() {
            return Err(PredictorError::deserialization(
                ArtifactKind::InferenceGraph,
                "graph exposes neither a label nor a probability output",
            ));
        }

        info!(
            input = %input_name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            threads = onnx_threads,
            "ONNX graph loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
        })
    }

    fn run(&self, features: &FeatureVector) -> anyhow::Result<Prediction> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor = Tensor::from_array((shape, features.as_slice().to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let probability = match &self.probability_output {
            Some(name) => Some(extract_probability(&outputs, name)?),
            None => None,
        };

        let label = match &self.label_output {
            Some(name) => extract_label(&outputs, name)?,
            None => None,
        };

        let label = resolve_label(label, probability)?;

        debug!(label = label, probability = ?probability, "ONNX inference complete");

        Ok(Prediction { label, probability })
    }
}

/// Prefer the graph's own label; graphs without one are thresholded at 0.5
fn resolve_label(label: Option<i64>, probability: Option<f64>) -> anyhow::Result<i64> {
    label
        .or_else(|| probability.map(|p| if p >= 0.5 { 1 } else { 0 }))
        .ok_or_else(|| anyhow::anyhow!("graph produced neither label nor probability"))
}

fn build_session(bytes: &[u8], onnx_threads: usize) -> anyhow::Result<Session> {
    ort::init().commit()?;

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(onnx_threads)?
        .commit_from_memory(bytes)
        .context("Failed to load inference graph")?;

    Ok(session)
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        Ok(self.evaluate(features)?.label)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Option<f64>> {
        Ok(self.evaluate(features)?.probability)
    }

    fn supports_probability(&self) -> bool {
        self.probability_output.is_some()
    }

    /// One session run yields both outputs
    fn evaluate(&self, features: &FeatureVector) -> Result<Prediction> {
        self.run(features)
            .map_err(|e| PredictorError::Inference(format!("{:#}", e)))
    }
}

/// First element of the label output
fn extract_label(outputs: &SessionOutputs, output_name: &str) -> anyhow::Result<Option<i64>> {
    let Some(output) = outputs.get(output_name) else {
        return Ok(None);
    };
    let (_, data) = output
        .try_extract_tensor::<i64>()
        .context("Label output is not an int64 tensor")?;
    Ok(data.first().copied())
}

/// Positive class probability from a tensor or seq(map) output
fn extract_probability(outputs: &SessionOutputs, output_name: &str) -> anyhow::Result<f64> {
    let output = outputs
        .get(output_name)
        .ok_or_else(|| anyhow::anyhow!("Missing output {}", output_name))?;

    // Tensor format (sklearn converters without zipmap, XGBoost)
    if let Ok(tensor) = output.try_extract_tensor::<f32>() {
        let (shape, data) = tensor;
        let dims: Vec<i64> = shape.iter().copied().collect();
        return positive_prob_from_tensor(&dims, data);
    }

    // Sequence format (zipmap, LightGBM, CatBoost) - seq(map(int64, float))
    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return positive_prob_from_sequence_map(output);
    }

    Err(anyhow::anyhow!(
        "Unsupported probability output type for {}",
        output_name
    ))
}

/// Extract class 1 probability from seq(map(int64, float)) format
fn positive_prob_from_sequence_map(output: &DynValue) -> anyhow::Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    // Batch size is always 1
    let map_value = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    positive_prob_from_pairs(&kv_pairs)
}

/// Class 1 probability from `(class, probability)` pairs, or its complement
/// when only class 0 is present
fn positive_prob_from_pairs(pairs: &[(i64, f32)]) -> anyhow::Result<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = pairs.iter().find(|(class_id, _)| *class_id == 0) {
        return Ok(1.0 - *prob as f64);
    }

    Err(anyhow::anyhow!("No probability found in map"))
}

/// Extract class 1 probability from a `[batch, classes]` or `[classes]` tensor
fn positive_prob_from_tensor(dims: &[i64], data: &[f32]) -> anyhow::Result<f64> {
    let num_classes = dims.last().copied().unwrap_or(0);

    match (num_classes, data) {
        (n, [_, p1, ..]) if n >= 2 => Ok(*p1 as f64),
        (1, [p]) => Ok(*p as f64),
        _ => Err(anyhow::anyhow!("Unexpected probability tensor shape {:?}", dims)),
    }
}
