//! Configuration management for the scoring service

use crate::models::encoder::DEFAULT_FALLBACK_CODE;
use crate::policy::RiskPolicy;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where fraud alerts are dispatched
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    /// Publish alerts on the NATS alert subject
    #[default]
    Nats,
    /// Only log the alert (simulation mode)
    Log,
}

/// Document format for transaction reports
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `report_{id}.pdf`, needs a TrueType font family on disk
    #[default]
    Pdf,
    /// `report_{id}.txt`
    Text,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    pub policy: RiskPolicy,
    pub alerting: AlertingConfig,
    pub reports: ReportsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transactions to score
    pub transaction_subject: String,
    /// Subject for history/report/chat queries
    pub query_subject: String,
    /// Subject for outgoing fraud alerts
    pub alert_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            transaction_subject: "transactions".to_string(),
            query_subject: "fraud.query".to_string(),
            alert_subject: "fraud.alerts".to_string(),
        }
    }
}

/// Trained artifact bundle location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding the bundle
    pub dir: PathBuf,
    /// ONNX classifier file
    pub model_file: String,
    /// Name used in logs
    pub model_name: String,
    /// Scaler statistics file
    pub scaler_file: String,
    /// Encoder table file
    pub encoders_file: String,
    /// Code substituted for categorical values unseen during training
    pub fallback_code: i64,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            model_file: "fraud_model.onnx".to_string(),
            model_name: "random_forest".to_string(),
            scaler_file: "scaler.json".to_string(),
            encoders_file: "encoders.json".to_string(),
            fallback_code: DEFAULT_FALLBACK_CODE,
            onnx_threads: 1,
        }
    }
}

/// Fraud alert configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Alert recipient
    pub recipient: String,
    /// Dispatch channel
    pub channel: AlertChannel,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            recipient: "fraud-desk@example.com".to_string(),
            channel: AlertChannel::Nats,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Directory reports are written to
    pub dir: PathBuf,
    pub format: ReportFormat,
    /// Searched for fonts before the system font directories
    pub font_dir: Option<PathBuf>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            format: ReportFormat::Pdf,
            font_dir: None,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum messages processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
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
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `SCORING__` environment
    /// overrides (e.g. `SCORING__NATS__URL`)
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("SCORING").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        if self.alerting.recipient.trim().is_empty() {
            anyhow::bail!("alerting.recipient must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.artifacts.fallback_code, 0);
        assert_eq!(config.policy, RiskPolicy::default());
        assert_eq!(config.alerting.channel, AlertChannel::Nats);
        assert_eq!(config.reports.format, ReportFormat::Pdf);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[nats]
url = "nats://broker:4222"

[artifacts]
dir = "/opt/bundle"
fallback_code = -1

[alerting]
recipient = "alerts@bank.example"
channel = "log"

[reports]
format = "text"

[pipeline]
workers = 8
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.nats.url, "nats://broker:4222");
        assert_eq!(config.nats.transaction_subject, "transactions");
        assert_eq!(config.artifacts.dir, PathBuf::from("/opt/bundle"));
        assert_eq!(config.artifacts.fallback_code, -1);
        assert_eq!(config.artifacts.scaler_file, "scaler.json");
        assert_eq!(config.alerting.channel, AlertChannel::Log);
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.reports.format, ReportFormat::Text);
        assert_eq!(config.reports.dir, PathBuf::from("reports"));
        assert_eq!(config.policy.fraud, 0.95);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[policy]\nlow = 0.6\nmedium = 0.5\nhigh = 0.8\nfraud = 0.95\n",
        )
        .unwrap();

        assert!(AppConfig::load_from_path(&path).is_err());
    }
}
