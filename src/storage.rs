//! Append-only transaction history
//!
//! Aggregates (fraud counts, flagged merchants) are always computed by
//! scanning the stored records, never accumulated on the side.

use crate::error::ScoringResult;
use crate::policy::RiskTier;
use crate::types::record::{NewRecord, TransactionRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage collaborator for scored transactions
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Append a record and return it with its assigned identifier
    async fn append(&self, record: NewRecord) -> ScoringResult<TransactionRecord>;

    /// Fetch one record by identifier
    async fn get(&self, id: u64) -> ScoringResult<Option<TransactionRecord>>;

    /// Full history in insertion order
    async fn history(&self) -> ScoringResult<Vec<TransactionRecord>>;
}

/// Process-local store; identifiers start at 1
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn append(&self, record: NewRecord) -> ScoringResult<TransactionRecord> {
        let mut records = self.records.write().await;
        let id = records.len() as u64 + 1;
        let record = TransactionRecord::from_new(id, record);
        records.push(record.clone());

        debug!(transaction_id = id, risk_level = %record.result.risk_level, "Record appended");
        Ok(record)
    }

    async fn get(&self, id: u64) -> ScoringResult<Option<TransactionRecord>> {
        let records = self.records.read().await;
        let index = match id.checked_sub(1) {
            Some(index) => index as usize,
            None => return Ok(None),
        };
        Ok(records.get(index).cloned())
    }

    async fn history(&self) -> ScoringResult<Vec<TransactionRecord>> {
        Ok(self.records.read().await.clone())
    }
}

/// Aggregate view over a history snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistorySummary {
    pub total: usize,
    pub by_tier: HashMap<RiskTier, usize>,
}

impl HistorySummary {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut by_tier = HashMap::new();
        for record in records {
            *by_tier.entry(record.result.risk_level).or_insert(0) += 1;
        }
        Self {
            total: records.len(),
            by_tier,
        }
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        self.by_tier.get(&tier).copied().unwrap_or(0)
    }

    pub fn fraud_count(&self) -> usize {
        self.count(RiskTier::Fraud)
    }
}

/// Merchants with the most High Risk or Fraud records, most frequent first.
/// Ties keep the order in which merchants were first flagged.
pub fn top_flagged_merchants(records: &[TransactionRecord], limit: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records
        .iter()
        .filter(|r| r.result.risk_level >= RiskTier::High)
    {
        match counts
            .iter_mut()
            .find(|(merchant, _)| *merchant == record.transaction.merchant)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((record.transaction.merchant.clone(), 1)),
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}
