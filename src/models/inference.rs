//! Risk classifier: read-only inference over the trained model

use crate::error::{ScoringError, ScoringResult};
use crate::models::scaler::ScaledVector;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Trained binary classifier producing the probability of class 1 (fraud)
pub trait RiskModel: Send + Sync {
    /// Probability of fraud for one scaled feature row
    fn predict_proba(&self, features: &[f32]) -> Result<f64>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Output of the classifier for one transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    /// Fraud probability in [0, 1]
    pub probability: f64,
    /// Arg-max label: 1 when fraud is the more likely class
    pub label: u8,
}

/// Wraps a trained model in inference-only mode
pub struct RiskClassifier {
    model: Box<dyn RiskModel>,
}

impl RiskClassifier {
    pub fn new(model: Box<dyn RiskModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run the model on a scaled vector
    pub fn infer(&self, scaled: &ScaledVector) -> ScoringResult<Inference> {
        let raw = self
            .model
            .predict_proba(&scaled.to_f32())
            .map_err(|e| ScoringError::Inference(format!("{:#}", e)))?;

        if !raw.is_finite() {
            return Err(ScoringError::Inference(format!(
                "model {} returned non-finite probability {}",
                self.model.name(),
                raw
            )));
        }

        let probability = if (0.0..=1.0).contains(&raw) {
            raw
        } else {
            warn!(model = %self.model.name(), probability = raw, "Probability outside [0, 1], clamping");
            raw.clamp(0.0, 1.0)
        };

        // Ties go to class 0, like an arg-max over [p0, p1]
        let label = u8::from(probability > 0.5);

        debug!(model = %self.model.name(), probability = probability, label = label, "Inference complete");

        Ok(Inference { probability, label })
    }
}

/// ONNX Runtime model session
pub struct OnnxRiskModel {
    name: String,
    /// Running a session needs exclusive access in the runtime binding
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxRiskModel {
    pub fn new(name: &str, session: Session) -> Self {
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // Classifier exports carry a label output and a probability output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
        }
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl RiskModel for OnnxRiskModel {
    fn predict_proba(&self, features: &[f32]) -> Result<f64> {
        // Shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        extract_probability(&outputs, &self.output_name, &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Pull the fraud probability out of the session outputs.
///
/// Tree ensembles export either a `[batch, classes]` tensor or a
/// `seq(map(int64, float))` (zipmap) output.
fn extract_probability(outputs: &SessionOutputs, output_name: &str, model_name: &str) -> Result<f64> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(prob) = probability_from_value(&output, model_name) {
            return Ok(prob);
        }
    }

    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(prob) = probability_from_value(&output, model_name) {
            debug!(model = %model_name, output = %name, "Probability read from fallback output");
            return Ok(prob);
        }
    }

    anyhow::bail!("model {} produced no readable probability output", model_name)
}

fn probability_from_value(output: &DynValue, model_name: &str) -> Option<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return fraud_prob_from_tensor(&dims, data);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        match fraud_prob_from_sequence_map(output) {
            Ok(prob) => return Some(prob),
            Err(e) => debug!(model = %model_name, error = %e, "Could not read seq(map) output"),
        }
    }

    None
}

/// Class 1 probability from a `[batch, classes]`, `[classes]` or `[batch, 1]`
/// tensor
fn fraud_prob_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = match dims {
        [_, classes] => *classes,
        [classes] => *classes,
        _ => return None,
    };
    match classes {
        c if c >= 2 => data.get(1).map(|&p| p as f64),
        1 => data.first().map(|&p| p as f64),
        _ => None,
    }
}

/// Class 1 probability from a zipmap output; only batch size 1 is used
fn fraud_prob_from_sequence_map(output: &DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = first.try_extract_key_values::<i64, f32>()?;

    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
        return Ok(1.0 - *prob as f64);
    }

    Err(anyhow::anyhow!("No probability found in map"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scaler::ScalerParameters;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedModel {
        probability: f64,
        calls: Arc<AtomicUsize>,
    }

    impl RiskModel for FixedModel {
        fn predict_proba(&self, _features: &[f32]) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingModel;

    impl RiskModel for FailingModel {
        fn predict_proba(&self, _features: &[f32]) -> Result<f64> {
            anyhow::bail!("session exploded")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn scaled() -> ScaledVector {
        ScalerParameters::new("v1", vec![0.0; 2], vec![1.0; 2])
            .unwrap()
            .scale(&[0.5, 1.5])
            .unwrap()
    }

    fn classifier(probability: f64) -> RiskClassifier {
        RiskClassifier::new(Box::new(FixedModel {
            probability,
            calls: Arc::new(AtomicUsize::new(0)),
        }))
    }

    #[test]
    fn test_label_follows_argmax() {
        assert_eq!(classifier(0.51).infer(&scaled()).unwrap().label, 1);
        assert_eq!(classifier(0.5).infer(&scaled()).unwrap().label, 0);
        assert_eq!(classifier(0.02).infer(&scaled()).unwrap().label, 0);
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        assert_eq!(classifier(1.0000001).infer(&scaled()).unwrap().probability, 1.0);
        assert_eq!(classifier(-0.1).infer(&scaled()).unwrap().probability, 0.0);
    }

    #[test]
    fn test_non_finite_probability_is_error() {
        let result = classifier(f64::NAN).infer(&scaled());
        assert!(matches!(result, Err(ScoringError::Inference(_))));
    }

    #[test]
    fn test_model_failure_is_inference_error() {
        let result = RiskClassifier::new(Box::new(FailingModel)).infer(&scaled());
        match result {
            Err(ScoringError::Inference(msg)) => assert!(msg.contains("session exploded")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_inference() {
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier = Arc::new(RiskClassifier::new(Box::new(FixedModel {
            probability: 0.3,
            calls: calls.clone(),
        })));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let classifier = classifier.clone();
                std::thread::spawn(move || classifier.infer(&scaled()).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().probability, 0.3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_tensor_probability_layouts() {
        assert_eq!(fraud_prob_from_tensor(&[1, 2], &[0.25, 0.75]), Some(0.75));
        assert_eq!(fraud_prob_from_tensor(&[2], &[0.25, 0.75]), Some(0.75));
        assert_eq!(fraud_prob_from_tensor(&[1, 1], &[0.5]), Some(0.5));
        assert_eq!(fraud_prob_from_tensor(&[1, 2, 2], &[0.1; 4]), None);
    }
}
