//! Heart Risk Predictor Library
//!
//! Encodes clinical parameters into the feature vector a pre-trained heart
//! disease classifier expects, runs the classifier loaded from a remote
//! artifact, and interprets its output as a risk verdict.

pub mod assessor;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod types;

pub use assessor::Assessor;
pub use config::AppConfig;
pub use consumer::AssessmentConsumer;
pub use error::{PredictorError, Result};
pub use feature_encoder::{FeatureEncoder, FeatureVector};
pub use models::{ArtifactKind, InferenceAdapter, LazyAdapter};
pub use producer::ReportProducer;
pub use types::{clinical::ClinicalInput, report::AssessmentReport, verdict::Verdict};
