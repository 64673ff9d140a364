//! NATS publisher for assessment reports

use crate::types::report::{AssessmentRejection, AssessmentReport};
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Producer for publishing assessment reports to NATS
#[derive(Clone)]
pub struct ReportProducer {
    client: Client,
    subject: String,
}

impl ReportProducer {
    /// Create a new report producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a report on the report subject and answer the requester, if any
    pub async fn publish(&self, report: &AssessmentReport, reply: Option<&Subject>) -> Result<()> {
        let payload = serde_json::to_vec(report)?;

        self.client
            .publish(self.subject.clone(), payload.clone().into())
            .await?;

        if let Some(reply) = reply {
            self.client.publish(reply.clone(), payload.into()).await?;
        }

        debug!(
            assessment_id = %report.assessment_id,
            label = ?report.label,
            "Published assessment report"
        );

        Ok(())
    }

    /// Tell the requester why its submission was not classified
    pub async fn reject(&self, rejection: &AssessmentRejection, reply: &Subject) -> Result<()> {
        let payload = serde_json::to_vec(rejection)?;
        self.client.publish(reply.clone(), payload.into()).await?;
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
