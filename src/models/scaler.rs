//! Feature standardization with training-time statistics

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};

/// On-disk form of the scaler parameters (`scaler.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    /// Training run that produced these statistics
    pub bundle_version: String,
    /// Column order the scaler was fit on, when exported
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Standardized feature vector, ready for the classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledVector(Vec<f64>);

impl ScaledVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Model input precision
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

/// Per-feature `(mean, scale)` pairs, same order as the feature layout
#[derive(Debug, Clone)]
pub struct ScalerParameters {
    bundle_version: String,
    feature_names: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl ScalerParameters {
    pub fn new(bundle_version: &str, mean: Vec<f64>, scale: Vec<f64>) -> ScoringResult<Self> {
        Self::from_artifact(ScalerArtifact {
            bundle_version: bundle_version.to_string(),
            feature_names: None,
            mean,
            scale,
        })
    }

    pub fn from_artifact(artifact: ScalerArtifact) -> ScoringResult<Self> {
        if artifact.mean.len() != artifact.scale.len() {
            return Err(ScoringError::Configuration(format!(
                "scaler has {} means but {} scales",
                artifact.mean.len(),
                artifact.scale.len()
            )));
        }
        if let Some(names) = &artifact.feature_names {
            if names.len() != artifact.mean.len() {
                return Err(ScoringError::Configuration(format!(
                    "scaler lists {} feature names for {} statistics",
                    names.len(),
                    artifact.mean.len()
                )));
            }
        }
        if artifact
            .mean
            .iter()
            .chain(artifact.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ScoringError::Configuration(
                "scaler statistics contain non-finite values".to_string(),
            ));
        }

        // Constant features were fit with a zero variance; the scaler then
        // divides by one.
        let scale = artifact
            .scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self {
            bundle_version: artifact.bundle_version,
            feature_names: artifact.feature_names,
            mean: artifact.mean,
            scale,
        })
    }

    /// Number of features the scaler was fit on
    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    pub fn bundle_version(&self) -> &str {
        &self.bundle_version
    }

    /// Check the scaler against the serving feature layout
    pub fn check_layout(&self, layout: &[&str]) -> ScoringResult<()> {
        if self.feature_count() != layout.len() {
            return Err(ScoringError::Configuration(format!(
                "scaler expects {} features but the feature layout has {}",
                self.feature_count(),
                layout.len()
            )));
        }
        if let Some(names) = &self.feature_names {
            if let Some((position, (expected, actual))) = layout
                .iter()
                .zip(names.iter())
                .enumerate()
                .find(|(_, (expected, actual))| **expected != actual.as_str())
            {
                return Err(ScoringError::Configuration(format!(
                    "scaler feature {} is '{}' but the feature layout has '{}'",
                    position, actual, expected
                )));
            }
        }
        Ok(())
    }

    /// `(x - mean) / scale` per feature
    pub fn scale(&self, features: &[f64]) -> ScoringResult<ScaledVector> {
        if features.len() != self.feature_count() {
            return Err(ScoringError::Configuration(format!(
                "scaler expects {} features but received {}",
                self.feature_count(),
                features.len()
            )));
        }

        Ok(ScaledVector(
            features
                .iter()
                .zip(self.mean.iter().zip(self.scale.iter()))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
        ))
    }

    /// Inverse of [`ScalerParameters::scale`]
    pub fn unscale(&self, scaled: &ScaledVector) -> Vec<f64> {
        scaled
            .values()
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| x * s + m)
            .collect()
    }
}
