//! Type definitions for the heart risk predictor

pub mod clinical;
pub mod report;
pub mod verdict;

pub use clinical::ClinicalInput;
pub use report::{AssessmentRejection, AssessmentReport};
pub use verdict::{RiskLabel, Verdict};
