//! Feature encoding for heart disease model inference.
//!
//! This module maps clinical inputs onto the numeric feature vector
//! the classifier was trained on.

use crate::types::clinical::ClinicalInput;
use serde::Serialize;

/// Number of features the classifier expects
pub const FEATURE_COUNT: usize = 11;

/// Training column names, in feature order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "sex",
    "chest_pain_type",
    "resting_bp_s",
    "cholesterol",
    "fasting_blood_sugar",
    "resting_ecg",
    "max_heart_rate",
    "exercise_angina",
    "oldpeak",
    "st_slope",
];

/// Fixed-order numeric encoding of one [`ClinicalInput`].
///
/// Values are `f32` because that is the tensor dtype of the inference
/// graph runtime; native estimators widen them through [`as_f64`](Self::as_f64).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    /// Build a vector from raw values already in training order.
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Values widened to `f64`
    pub fn as_f64(&self) -> [f64; FEATURE_COUNT] {
        self.0.map(f64::from)
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pair every value with its training column name.
    pub fn named(&self) -> Vec<NamedFeature> {
        FEATURE_NAMES
            .iter()
            .zip(self.0.iter())
            .map(|(&name, &value)| NamedFeature { name, value })
            .collect()
    }
}

/// One column of the input summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamedFeature {
    pub name: &'static str,
    pub value: f32,
}

/// Encoder that transforms clinical inputs into model input features.
///
/// Categorical codes match the encoding used when the model was trained.
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Create a new feature encoder.
    pub fn new() -> Self {
        Self
    }

    /// Encode a clinical input.
    ///
    /// Numeric fields pass through unchanged; categorical fields are
    /// replaced by their training-time codes.
    pub fn encode(&self, input: &ClinicalInput) -> FeatureVector {
        FeatureVector([
            input.age as f32,
            input.sex.code() as f32,
            input.chest_pain_type.code() as f32,
            input.resting_bp as f32,
            input.cholesterol as f32,
            input.fasting_blood_sugar.code() as f32,
            input.resting_ecg.code() as f32,
            input.max_heart_rate as f32,
            input.exercise_angina.code() as f32,
            input.oldpeak as f32,
            input.st_slope.code() as f32,
        ])
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (training column order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}
