//! Scoring outcome for a single transaction

use crate::policy::{RiskAction, RiskTier};
use serde::{Deserialize, Serialize};

/// Result of scoring one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Classifier label (1 = fraud)
    pub prediction: u8,

    /// Fraud probability (0.0 - 1.0)
    pub risk_score: f64,

    /// True only for the Fraud tier
    pub is_fraud: bool,

    /// Risk tier derived from the probability
    pub risk_level: RiskTier,

    /// Recommended action for the tier
    pub action_taken: RiskAction,

    /// Human-readable summary
    pub details: String,
}

impl RiskResult {
    pub fn new(prediction: u8, risk_score: f64, tier: RiskTier) -> Self {
        Self {
            prediction,
            risk_score,
            is_fraud: tier.is_fraud(),
            risk_level: tier,
            action_taken: tier.default_action(),
            details: format!("{} detected ({:.1}%)", tier, risk_score * 100.0),
        }
    }
}
