//! Query surface over the scoring pipeline and its collaborators

use crate::assistant;
use crate::error::{ScoringError, ScoringResult};
use crate::producer::AlertSink;
use crate::report::ReportRenderer;
use crate::scoring::{RiskScorer, SideEffect};
use crate::storage::TransactionStore;
use crate::types::alert::FraudAlert;
use crate::types::record::TransactionRecord;
use crate::types::risk::RiskResult;
use crate::types::transaction::RawTransaction;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Scoring state fixed at startup
pub enum ScoringEngine {
    Available(RiskScorer),
    /// Artifacts failed to load; every prediction is refused
    Unavailable(String),
}

/// Prediction returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Identifier of the persisted record
    pub id: u64,
    pub result: RiskResult,
}

/// Executes scoring decisions against the storage, alert and report
/// collaborators
pub struct FraudService {
    engine: ScoringEngine,
    store: Arc<dyn TransactionStore>,
    alerts: Arc<dyn AlertSink>,
    reports: Arc<dyn ReportRenderer>,
    alert_recipient: String,
}

impl FraudService {
    pub fn new(
        engine: ScoringEngine,
        store: Arc<dyn TransactionStore>,
        alerts: Arc<dyn AlertSink>,
        reports: Arc<dyn ReportRenderer>,
        alert_recipient: &str,
    ) -> Self {
        Self {
            engine,
            store,
            alerts,
            reports,
            alert_recipient: alert_recipient.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.engine, ScoringEngine::Available(_))
    }

    /// Score, persist and (for the Fraud tier) alert.
    ///
    /// Nothing is persisted when scoring fails. A failed store write is
    /// returned to the caller; a failed alert is only logged.
    pub async fn predict(&self, transaction: RawTransaction) -> ScoringResult<Prediction> {
        let scorer = match &self.engine {
            ScoringEngine::Available(scorer) => scorer,
            ScoringEngine::Unavailable(reason) => {
                return Err(ScoringError::Unavailable(reason.clone()))
            }
        };

        let outcome = scorer.score(&transaction)?;

        // Every outcome is persisted: the returned id comes from the store
        debug_assert!(outcome.requests(SideEffect::Persist));
        let record = self.store.append(outcome.to_record(&transaction)).await?;

        info!(
            transaction_id = record.id,
            merchant = %transaction.merchant,
            risk_score = outcome.result.risk_score,
            risk_level = %outcome.result.risk_level,
            action = %outcome.result.action_taken,
            "Transaction scored"
        );

        if outcome.requests(SideEffect::Alert) {
            self.dispatch_alert(&record);
        }

        Ok(Prediction {
            id: record.id,
            result: outcome.result,
        })
    }

    /// Fire-and-forget so a slow alert channel cannot stall scoring
    fn dispatch_alert(&self, record: &TransactionRecord) {
        let alert = FraudAlert::for_record(&self.alert_recipient, record);
        let sink = self.alerts.clone();

        tokio::spawn(async move {
            match sink.send(&alert).await {
                Ok(()) => info!(
                    alert_id = %alert.alert_id,
                    transaction_id = alert.transaction_id,
                    risk_score = alert.risk_score,
                    "Fraud alert dispatched"
                ),
                Err(e) => error!(
                    alert_id = %alert.alert_id,
                    transaction_id = alert.transaction_id,
                    error = %e,
                    "Failed to dispatch fraud alert"
                ),
            }
        });
    }

    /// Full history in insertion order
    pub async fn history(&self) -> ScoringResult<Vec<TransactionRecord>> {
        self.store.history().await
    }

    /// One record by identifier
    pub async fn record(&self, id: u64) -> ScoringResult<TransactionRecord> {
        self.store.get(id).await?.ok_or(ScoringError::NotFound(id))
    }

    /// Render the report for a stored record
    pub async fn report(&self, id: u64) -> ScoringResult<PathBuf> {
        let record = self.record(id).await?;
        self.reports.render(&record).await.map_err(|e| {
            error!(transaction_id = id, error = %e, "Report rendering failed");
            ScoringError::Report(format!("{:#}", e))
        })
    }

    /// Templated answer over the current history
    pub async fn chat(&self, query: &str) -> ScoringResult<String> {
        let history = self.store.history().await?;
        Ok(assistant::answer(query, &history))
    }
}
