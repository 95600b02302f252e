//! Fraud alert dispatch

use crate::types::alert::FraudAlert;
use anyhow::Result;
use async_nats::Client;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Alert collaborator, only ever called for the Fraud tier
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &FraudAlert) -> Result<()>;
}

/// Publishes fraud alerts to a NATS subject
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    /// Create a new alert producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait]
impl AlertSink for AlertProducer {
    async fn send(&self, alert: &FraudAlert) -> Result<()> {
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            transaction_id = alert.transaction_id,
            risk_score = alert.risk_score,
            "Published fraud alert"
        );

        Ok(())
    }
}

/// Logs alerts instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &FraudAlert) -> Result<()> {
        warn!(
            alert_id = %alert.alert_id,
            recipient = %alert.recipient,
            transaction_id = alert.transaction_id,
            merchant = %alert.merchant,
            risk_score = alert.risk_score,
            subject = %alert.subject(),
            "SIMULATION: fraud alert not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RiskTier;
    use crate::types::record::{NewRecord, TransactionRecord};
    use crate::types::risk::RiskResult;
    use crate::types::transaction::RawTransaction;

    #[tokio::test]
    async fn test_log_sink_accepts_alert() {
        let record = TransactionRecord::from_new(
            1,
            NewRecord {
                transaction: RawTransaction::new("fraud_merchant_0", "travel", 500.0),
                dist: 0.8,
                result: RiskResult::new(1, 0.99, RiskTier::Fraud),
            },
        );
        let alert = FraudAlert::for_record("desk@example.com", &record);
        assert!(LogAlertSink.send(&alert).await.is_ok());
    }

    // Publishing requires a running NATS server
}
