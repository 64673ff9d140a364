//! Classifier output interpreted as a risk verdict

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary risk label shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Normal,
    HighRisk,
}

impl RiskLabel {
    pub fn headline(self) -> &'static str {
        match self {
            RiskLabel::HighRisk => "High Risk of Heart Disease",
            RiskLabel::Normal => "No Heart Disease",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.headline())
    }
}

/// Result of classifying one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Classifier predicted the positive (disease) class
    pub positive: bool,
    /// Probability of the positive class, when the model exposes one
    pub probability: Option<f64>,
}

impl Verdict {
    pub fn new(positive: bool, probability: Option<f64>) -> Self {
        Self {
            positive,
            probability,
        }
    }

    pub fn label(&self) -> RiskLabel {
        if self.positive {
            RiskLabel::HighRisk
        } else {
            RiskLabel::Normal
        }
    }

    /// User-facing message: the label, plus the probability when known.
    pub fn message(&self) -> String {
        match self.probability {
            Some(p) => format!("{} - Probability: {:.2}", self.label(), p),
            None => self.label().to_string(),
        }
    }
}
