//! One assessment: validate, encode, classify, report

use crate::error::Result;
use crate::feature_encoder::FeatureEncoder;
use crate::models::loader::LazyAdapter;
use crate::types::clinical::ClinicalInput;
use crate::types::report::AssessmentReport;
use std::sync::Arc;

/// Runs the encode→classify pipeline against a shared model.
#[derive(Clone)]
pub struct Assessor {
    encoder: Arc<FeatureEncoder>,
    adapter: Arc<LazyAdapter>,
}

impl Assessor {
    pub fn new(adapter: Arc<LazyAdapter>) -> Self {
        Self {
            encoder: Arc::new(FeatureEncoder::new()),
            adapter,
        }
    }

    pub fn adapter(&self) -> &LazyAdapter {
        &self.adapter
    }

    /// Produce a report for one submission.
    ///
    /// Either the full report is returned or no verdict at all.
    pub fn assess(&self, input: ClinicalInput) -> Result<AssessmentReport> {
        input.validate()?;
        let features = self.encoder.encode(&input);
        let verdict = self.adapter.classify(&features)?;
        Ok(AssessmentReport::new(
            input,
            &features,
            verdict,
            self.adapter.kind(),
        ))
    }
}
