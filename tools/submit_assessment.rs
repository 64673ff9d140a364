//! Test Assessment Submitter
//!
//! Generates random clinical inputs and sends them to the predictor as NATS
//! requests, logging each report it gets back.

use heart_risk_predictor::types::clinical::{
    ChestPainType, ClinicalInput, ExerciseAngina, FastingBloodSugar, RestingEcg, Sex, StSlope,
    AGE_RANGE, CHOLESTEROL_RANGE, MAX_HEART_RATE_RANGE, RESTING_BP_RANGE,
};
use heart_risk_predictor::FeatureEncoder;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Random input generator covering the whole form domain
struct InputGenerator {
    rng: rand::rngs::ThreadRng,
}

impl InputGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn generate(&mut self) -> ClinicalInput {
        ClinicalInput {
            age: self.rng.gen_range(AGE_RANGE),
            sex: self.pick(Sex::ALL),
            chest_pain_type: self.pick(ChestPainType::ALL),
            resting_bp: self.rng.gen_range(RESTING_BP_RANGE),
            cholesterol: self.rng.gen_range(CHOLESTEROL_RANGE),
            fasting_blood_sugar: self.pick(FastingBloodSugar::ALL),
            resting_ecg: self.pick(RestingEcg::ALL),
            max_heart_rate: self.rng.gen_range(MAX_HEART_RATE_RANGE),
            exercise_angina: self.pick(ExerciseAngina::ALL),
            // 0.0..=6.5 in steps of 0.1
            oldpeak: self.rng.gen_range(0..=65) as f64 / 10.0,
            st_slope: self.pick(StSlope::ALL),
        }
    }

    fn pick<T: Copy>(&mut self, options: &[T]) -> T {
        options[self.rng.gen_range(0..options.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_assessment=info".parse()?),
        )
        .init();

    info!("Starting Test Assessment Submitter");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("heart.assessments");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(250);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let mut generator = InputGenerator::new();
    let mut high_risk = 0;

    for i in 0..count {
        let input = generator.generate();
        let payload = serde_json::to_vec(&input)?;

        let response = client.request(subject.to_string(), payload.into()).await?;
        let report: serde_json::Value = serde_json::from_slice(&response.payload)?;

        if report["label"] == "high_risk" {
            high_risk += 1;
        }

        info!(
            n = i + 1,
            age = input.age,
            chest_pain_type = %input.chest_pain_type,
            message = %report["message"].as_str().or(report["error"].as_str()).unwrap_or("?"),
            "Assessment answered"
        );

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! {} assessments sent, {} high risk", count, high_risk);

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = InputGenerator::new();
    let encoder = FeatureEncoder::new();

    for i in 0..count {
        let input = generator.generate();
        let features = encoder.encode(&input);

        if (i + 1) % 10 == 0 || i == 0 {
            info!(
                "Sample input {}:\n{}\nfeatures: {:?}",
                i + 1,
                serde_json::to_string_pretty(&input)?,
                features.as_slice()
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
