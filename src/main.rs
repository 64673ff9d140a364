//! Heart Risk Predictor - Main Entry Point
//!
//! Loads the model artifact once, then consumes assessment requests from
//! NATS and publishes a report for each of them.

use anyhow::{Context, Result};
use futures::StreamExt;
use heart_risk_predictor::{
    config::{AppConfig, LoggingConfig},
    consumer::{decode_input, AssessmentConsumer},
    metrics::{AssessmentMetrics, MetricsReporter},
    models::{source::source_for_url, LazyAdapter, ModelLoader},
    producer::ReportProducer,
    types::report::AssessmentRejection,
    Assessor,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Heart Risk Predictor");

    let url = config.artifact.resolved_url()?;
    info!(
        url = %url,
        kind = %config.artifact.kind,
        timeout_secs = ?config.artifact.timeout_secs,
        "Artifact source configured"
    );

    let source = source_for_url(&url, config.artifact.timeout());
    let adapter = Arc::new(LazyAdapter::new(
        url,
        config.artifact.kind,
        source,
        ModelLoader::with_threads(config.artifact.onnx_threads),
    ));

    // Load the model before accepting requests; a failure halts the service
    let warm = adapter.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        warm.get().map(|a| (a.kind(), a.supports_probability()))
    })
    .await
    .context("Model loading task panicked")?;

    let (kind, probability) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "Unable to load model, shutting down");
            return Err(e.into());
        }
    };
    info!(kind = %kind, probability = probability, "Model ready");

    let assessor = Assessor::new(adapter);
    let metrics = Arc::new(AssessmentMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = AssessmentConsumer::new(client.clone(), &config.nats.assessment_subject);
    let producer = Arc::new(ReportProducer::new(client.clone(), &config.nats.report_subject));
    info!("Publishing reports to: {}", producer.subject());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let num_workers = config.pipeline.workers.max(1);
    info!("Processing assessments with {} concurrent workers", num_workers);
    let semaphore = Arc::new(Semaphore::new(num_workers));

    let mut subscription = consumer.subscribe().await?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        };

        // Acquire permit (limits concurrent tasks)
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let assessor = assessor.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let reply = message.reply.as_ref();

            let outcome = decode_input(&message.payload)
                .and_then(|input| assessor.assess(input).map_err(anyhow::Error::from));

            match outcome {
                Ok(report) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_assessment(processing_time, &report.verdict);

                    if let Err(e) = producer.publish(&report, reply).await {
                        error!(
                            assessment_id = %report.assessment_id,
                            error = %e,
                            "Failed to publish assessment report"
                        );
                    } else {
                        debug!(
                            assessment_id = %report.assessment_id,
                            label = ?report.label,
                            probability = ?report.verdict.probability,
                            processing_time_us = processing_time.as_micros() as u64,
                            "Assessment processed"
                        );
                    }
                }
                Err(e) => {
                    metrics.record_rejection();
                    warn!(error = %format!("{:#}", e), "Assessment rejected");

                    if let Some(reply) = reply {
                        let rejection = AssessmentRejection::new(format!("{:#}", e));
                        if let Err(e) = producer.reject(&rejection, reply).await {
                            error!(error = %e, "Failed to send rejection");
                        }
                    }
                }
            }

            drop(permit);
        });
    }

    info!("Heart Risk Predictor shutting down...");
    wait_for_workers(&semaphore, num_workers).await;
    metrics.print_summary();

    Ok(())
}

/// Block until every in-flight assessment has released its permit
async fn wait_for_workers(semaphore: &Semaphore, num_workers: usize) {
    let permits = u32::try_from(num_workers).unwrap_or(u32::MAX);
    if semaphore.acquire_many(permits).await.is_err() {
        warn!("Worker semaphore closed before in-flight assessments finished");
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("heart_risk_predictor={}", logging.level).parse()?);

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    Ok(())
}
