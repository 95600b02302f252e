//! Artifact bundle loader

use crate::config::ArtifactsConfig;
use crate::error::{ScoringError, ScoringResult};
use crate::models::bundle::ArtifactBundle;
use crate::models::encoder::{EncoderArtifact, EncoderTable};
use crate::models::inference::{OnnxRiskModel, RiskClassifier};
use crate::models::scaler::{ScalerArtifact, ScalerParameters};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

/// Loader for the trained artifact bundle
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a loader with the given ONNX intra-op thread count
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load encoder, scaler and model as one unit
    pub fn load(&self, config: &ArtifactsConfig) -> Result<ArtifactBundle> {
        let (encoder, scaler) = load_tables(config)?;

        let model_path = config.dir.join(&config.model_file);
        let session = self.load_session(&model_path)?;
        let model = OnnxRiskModel::new(&config.model_name, session);

        info!(
            model = %config.model_name,
            input = %model.input_name(),
            output = %model.output_name(),
            "Model loaded successfully"
        );

        let bundle = ArtifactBundle::new(encoder, scaler, RiskClassifier::new(Box::new(model)))?;

        info!(
            bundle_version = %bundle.version(),
            dir = %config.dir.display(),
            "Artifact bundle loaded"
        );

        Ok(bundle)
    }

    fn load_session(&self, path: &Path) -> Result<Session> {
        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))
    }
}

/// Read and validate the encoder table and scaler parameters
pub fn load_tables(config: &ArtifactsConfig) -> ScoringResult<(EncoderTable, ScalerParameters)> {
    let encoder_artifact: EncoderArtifact = read_json(&config.dir.join(&config.encoders_file))?;
    let scaler_artifact: ScalerArtifact = read_json(&config.dir.join(&config.scaler_file))?;

    let encoder = EncoderTable::from_artifact(encoder_artifact, config.fallback_code)?;
    let scaler = ScalerParameters::from_artifact(scaler_artifact)?;

    info!(
        bundle_version = %encoder.bundle_version(),
        scaler_features = scaler.feature_count(),
        fallback_code = encoder.fallback_code(),
        "Encoder table and scaler loaded"
    );

    Ok((encoder, scaler))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ScoringResult<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ScoringError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        ScoringError::Configuration(format!("cannot parse {}: {}", path.display(), e))
    })
}
