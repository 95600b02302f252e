//! Persisted scoring history

use crate::types::risk::RiskResult;
use crate::types::transaction::RawTransaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record handed to the store; the store assigns its identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub transaction: RawTransaction,
    pub dist: f64,
    pub result: RiskResult,
}

/// Immutable entry of the append-only transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Identifier assigned by the store
    pub id: u64,

    /// Time the record was persisted
    pub timestamp: DateTime<Utc>,

    /// Derived cardholder/merchant distance
    pub dist: f64,

    #[serde(flatten)]
    pub transaction: RawTransaction,

    #[serde(flatten)]
    pub result: RiskResult,
}

impl TransactionRecord {
    pub fn from_new(id: u64, record: NewRecord) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            dist: record.dist,
            transaction: record.transaction,
            result: record.result,
        }
    }
}
