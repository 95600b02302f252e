//! Risk policy: maps a fraud probability onto a risk tier and action
//!
//! The tiers partition [0, 1] with inclusive lower bounds and exclusive upper
//! bounds, except the top tier which is closed at 1.0. A probability sitting
//! exactly on a boundary belongs to the higher tier.

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier, ordered from least to most risky
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Risk Free")]
    RiskFree,
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Fraud")]
    Fraud,
}

impl RiskTier {
    pub const ALL: [RiskTier; 5] = [
        RiskTier::RiskFree,
        RiskTier::Low,
        RiskTier::Medium,
        RiskTier::High,
        RiskTier::Fraud,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::RiskFree => "Risk Free",
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
            RiskTier::Fraud => "Fraud",
        }
    }

    /// Only the Fraud tier is confirmed fraud; High Risk is flagged only
    pub fn is_fraud(&self) -> bool {
        matches!(self, RiskTier::Fraud)
    }

    /// Alerts are reserved for the most confident tier
    pub fn triggers_alert(&self) -> bool {
        self.is_fraud()
    }

    pub fn default_action(&self) -> RiskAction {
        match self {
            RiskTier::RiskFree | RiskTier::Low | RiskTier::Medium => RiskAction::None,
            RiskTier::High => RiskAction::FlaggedForReview,
            RiskTier::Fraud => RiskAction::CardBlocked,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recommended action attached to a risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskAction {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "Flagged for Review")]
    FlaggedForReview,
    #[serde(rename = "Card Blocked & Alert Sent")]
    CardBlocked,
}

impl RiskAction {
    pub fn label(&self) -> &'static str {
        match self {
            RiskAction::None => "None",
            RiskAction::FlaggedForReview => "Flagged for Review",
            RiskAction::CardBlocked => "Card Blocked & Alert Sent",
        }
    }
}

impl fmt::Display for RiskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower bounds of every tier above Risk Free
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub fraud: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            low: 0.20,
            medium: 0.50,
            high: 0.80,
            fraud: 0.95,
        }
    }
}

impl RiskPolicy {
    /// Boundaries must be strictly increasing inside (0, 1]
    pub fn validate(&self) -> ScoringResult<()> {
        let bounds = [0.0, self.low, self.medium, self.high, self.fraud];
        let increasing = bounds.windows(2).all(|w| w[0] < w[1]);
        if !increasing || self.fraud > 1.0 || bounds.iter().any(|b| !b.is_finite()) {
            return Err(ScoringError::Configuration(format!(
                "risk policy boundaries must be strictly increasing in (0, 1], got {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Classify a probability. Total over the real line: values below zero
    /// fall into Risk Free and values above one into Fraud.
    pub fn classify(&self, probability: f64) -> RiskTier {
        if probability >= self.fraud {
            RiskTier::Fraud
        } else if probability >= self.high {
            RiskTier::High
        } else if probability >= self.medium {
            RiskTier::Medium
        } else if probability >= self.low {
            RiskTier::Low
        } else {
            RiskTier::RiskFree
        }
    }

    /// Probability interval `[lower, upper)` covered by a tier; the Fraud
    /// interval is closed at 1.0
    pub fn range(&self, tier: RiskTier) -> (f64, f64) {
        match tier {
            RiskTier::RiskFree => (0.0, self.low),
            RiskTier::Low => (self.low, self.medium),
            RiskTier::Medium => (self.medium, self.high),
            RiskTier::High => (self.high, self.fraud),
            RiskTier::Fraud => (self.fraud, 1.0),
        }
    }
}
