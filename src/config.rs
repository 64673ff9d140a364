//! Configuration management for the heart risk predictor

use crate::models::ArtifactKind;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`]
pub const CONFIG_PATH_ENV: &str = "HEART_RISK_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifact: ArtifactConfig,
    pub nats: NatsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Direct artifact URL (`https://...` or `file://...`)
    #[serde(default)]
    pub url: Option<String>,
    /// Google Drive file id, used when `url` is not set
    #[serde(default)]
    pub drive_file_id: Option<String>,
    /// Serialization format of the artifact
    #[serde(default)]
    pub kind: ArtifactKind,
    /// Download timeout in seconds (unset: wait indefinitely)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

impl ArtifactConfig {
    /// URL the artifact is fetched from
    pub fn resolved_url(&self) -> Result<String> {
        match (&self.url, &self.drive_file_id) {
            (Some(url), _) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            (_, Some(id)) if !id.trim().is_empty() => {
                Ok(format!("https://drive.google.com/uc?id={}", id.trim()))
            }
            _ => anyhow::bail!("artifact.url or artifact.drive_file_id must be set"),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming assessment requests
    pub assessment_subject: String,
    /// Subject for outgoing assessment reports
    pub report_subject: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum assessments processed concurrently
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries (0 disables them)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `HEART_RISK_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.as_ref().display()))?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.artifact.resolved_url()?;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifact: ArtifactConfig {
                url: None,
                drive_file_id: Some("1EB9x5IAeSjCx9UWfUqvYZOCHwV8jo-Ty".to_string()),
                kind: ArtifactKind::NativePipeline,
                timeout_secs: None,
                onnx_threads: 1,
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                assessment_subject: "heart.assessments".to_string(),
                report_subject: "heart.reports".to_string(),
            },
            pipeline: PipelineConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
