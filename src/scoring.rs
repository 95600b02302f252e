//! Scoring orchestrator
//!
//! Runs one transaction through feature extraction, encoding, scaling,
//! inference and the risk policy. No I/O happens here: the outcome lists the
//! side effects the caller is expected to carry out.

use crate::error::ScoringResult;
use crate::feature_extractor::FeatureExtractor;
use crate::models::bundle::ArtifactBundle;
use crate::policy::RiskPolicy;
use crate::types::record::NewRecord;
use crate::types::risk::RiskResult;
use crate::types::transaction::RawTransaction;
use std::sync::Arc;
use tracing::debug;

/// Side effect requested by a scoring outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Append the record to the transaction history
    Persist,
    /// Dispatch a fraud alert for the persisted record
    Alert,
}

/// Decision for one transaction plus the side effects it requests
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub result: RiskResult,
    /// Derived cardholder/merchant distance, stored with the record
    pub distance: f64,
    pub effects: Vec<SideEffect>,
}

impl ScoringOutcome {
    pub fn requests(&self, effect: SideEffect) -> bool {
        self.effects.contains(&effect)
    }

    /// Record to hand to the store
    pub fn to_record(&self, transaction: &RawTransaction) -> NewRecord {
        NewRecord {
            transaction: transaction.clone(),
            dist: self.distance,
            result: self.result.clone(),
        }
    }
}

/// Composes the scoring stages over a shared artifact bundle
#[derive(Clone)]
pub struct RiskScorer {
    bundle: Arc<ArtifactBundle>,
    policy: RiskPolicy,
}

impl RiskScorer {
    pub fn new(bundle: Arc<ArtifactBundle>, policy: RiskPolicy) -> Self {
        Self { bundle, policy }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Score one transaction. Any stage failing fails the whole request.
    pub fn score(&self, transaction: &RawTransaction) -> ScoringResult<ScoringOutcome> {
        transaction.validate()?;

        let features = FeatureExtractor::new().extract(transaction, self.bundle.encoder());
        debug!(features = ?features.named(), "Features extracted");

        let scaled = self.bundle.scaler().scale(&features.to_array())?;
        let inference = self.bundle.classifier().infer(&scaled)?;

        let tier = self.policy.classify(inference.probability);
        let result = RiskResult::new(inference.label, inference.probability, tier);

        let mut effects = vec![SideEffect::Persist];
        if tier.triggers_alert() {
            effects.push(SideEffect::Alert);
        }

        Ok(ScoringOutcome {
            result,
            distance: features.dist,
            effects,
        })
    }
}
