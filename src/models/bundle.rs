//! Co-versioned artifact bundle: encoder table, scaler and classifier

use crate::error::{ScoringError, ScoringResult};
use crate::feature_extractor::FEATURE_LAYOUT;
use crate::models::encoder::EncoderTable;
use crate::models::inference::RiskClassifier;
use crate::models::scaler::ScalerParameters;

/// Everything the pipeline needs from training, loaded once and shared
/// read-only by all requests.
pub struct ArtifactBundle {
    encoder: EncoderTable,
    scaler: ScalerParameters,
    classifier: RiskClassifier,
}

impl ArtifactBundle {
    /// Assemble a bundle, refusing parts from different training runs or a
    /// scaler that does not match the feature layout.
    pub fn new(
        encoder: EncoderTable,
        scaler: ScalerParameters,
        classifier: RiskClassifier,
    ) -> ScoringResult<Self> {
        if encoder.bundle_version() != scaler.bundle_version() {
            return Err(ScoringError::Configuration(format!(
                "encoder table is from bundle '{}' but scaler is from bundle '{}'",
                encoder.bundle_version(),
                scaler.bundle_version()
            )));
        }
        scaler.check_layout(&FEATURE_LAYOUT)?;

        Ok(Self {
            encoder,
            scaler,
            classifier,
        })
    }

    pub fn encoder(&self) -> &EncoderTable {
        &self.encoder
    }

    pub fn scaler(&self) -> &ScalerParameters {
        &self.scaler
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn version(&self) -> &str {
        self.encoder.bundle_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FEATURE_COUNT;
    use crate::models::inference::RiskModel;

    struct NeverCalled;

    impl RiskModel for NeverCalled {
        fn predict_proba(&self, _features: &[f32]) -> anyhow::Result<f64> {
            panic!("inference must not run for an invalid bundle")
        }

        fn name(&self) -> &str {
            "never"
        }
    }

    fn encoder(version: &str) -> EncoderTable {
        EncoderTable::from_classes(version, [("gender", vec!["F", "M"])], 0).unwrap()
    }

    fn scaler(version: &str, features: usize) -> ScalerParameters {
        ScalerParameters::new(version, vec![0.0; features], vec![1.0; features]).unwrap()
    }

    #[test]
    fn test_consistent_bundle() {
        let bundle = ArtifactBundle::new(
            encoder("2024-06-01"),
            scaler("2024-06-01", FEATURE_COUNT),
            RiskClassifier::new(Box::new(NeverCalled)),
        )
        .unwrap();
        assert_eq!(bundle.version(), "2024-06-01");
        assert_eq!(bundle.scaler().feature_count(), FEATURE_COUNT);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let result = ArtifactBundle::new(
            encoder("2024-06-01"),
            scaler("2024-07-15", FEATURE_COUNT),
            RiskClassifier::new(Box::new(NeverCalled)),
        );
        assert!(matches!(result, Err(ScoringError::Configuration(_))));
    }

    #[test]
    fn test_feature_count_mismatch_is_rejected_before_inference() {
        let result = ArtifactBundle::new(
            encoder("v1"),
            scaler("v1", 10),
            RiskClassifier::new(Box::new(NeverCalled)),
        );
        match result {
            Err(ScoringError::Configuration(msg)) => assert!(msg.contains("10")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("bundle with 10 scaler features must be rejected"),
        }
    }
}
