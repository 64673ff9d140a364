//! NATS subscriber for incoming assessment requests

use crate::types::clinical::{ClinicalInput, ClinicalSubmission};
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving assessment requests from NATS
pub struct AssessmentConsumer {
    client: Client,
    subject: String,
}

impl AssessmentConsumer {
    /// Create a new assessment consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the assessment subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to assessment subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a message payload into a clinical input.
///
/// Undecodable JSON is a malformed request; an unknown categorical option
/// surfaces as [`PredictorError::InvalidInput`](crate::PredictorError).
pub fn decode_input(payload: &[u8]) -> Result<ClinicalInput> {
    let raw: ClinicalSubmission =
        serde_json::from_slice(payload).context("Malformed assessment request")?;
    Ok(ClinicalInput::try_from(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictorError;
    use crate::types::clinical::{ChestPainType, Sex};

    #[test]
    fn test_decode_input() {
        let payload = serde_json::to_vec(&ClinicalInput {
            sex: Sex::Male,
            chest_pain_type: ChestPainType::Asymptomatic,
            ..ClinicalInput::default()
        })
        .unwrap();

        let input = decode_input(&payload).unwrap();
        assert_eq!(input.sex, Sex::Male);
        assert_eq!(input.chest_pain_type, ChestPainType::Asymptomatic);
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let err = decode_input(br#"{"age": 50}"#).unwrap_err();
        assert!(err.to_string().contains("Malformed assessment request"));
    }

    #[test]
    fn test_decode_unknown_option_is_invalid_input() {
        let payload = serde_json::to_string(&ClinicalInput::default())
            .unwrap()
            .replace("\"upward\"", "\"sideways\"");

        let err = decode_input(payload.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PredictorError>(),
            Some(PredictorError::InvalidInput {
                field: "st_slope",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_accepts_any_case() {
        let payload = serde_json::to_string(&ClinicalInput::default())
            .unwrap()
            .replace("\"female\"", "\"FEMALE\"");

        let input = decode_input(payload.as_bytes()).unwrap();
        assert_eq!(input.sex, Sex::Female);
    }
}
