//! Card Transaction Risk Scoring
//!
//! Scores card transactions for fraud risk in real time: feature derivation,
//! categorical encoding, scaling, model inference and a tiered risk policy,
//! served over NATS with an append-only history, alerts and reports.

pub mod assistant;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod policy;
pub mod producer;
pub mod query;
pub mod report;
pub mod scoring;
pub mod service;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{ScoringError, ScoringResult};
pub use feature_extractor::FeatureExtractor;
pub use models::{ArtifactBundle, ArtifactLoader};
pub use policy::{RiskAction, RiskPolicy, RiskTier};
pub use scoring::{RiskScorer, ScoringOutcome, SideEffect};
pub use service::{FraudService, Prediction, ScoringEngine};
pub use types::{RawTransaction, RiskResult, TransactionRecord};
