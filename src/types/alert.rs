//! Fraud alert data structures

use crate::policy::RiskTier;
use crate::types::record::TransactionRecord;
use crate::types::transaction::format_amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert dispatched when a transaction lands in the Fraud tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Unique alert identifier
    pub alert_id: Uuid,

    /// Alert recipient (cardholder contact or fraud desk)
    pub recipient: String,

    /// Identifier of the persisted transaction record
    pub transaction_id: u64,

    /// Transaction date/time as submitted
    pub trans_date_trans_time: Option<String>,

    /// Merchant name
    pub merchant: String,

    /// Transaction amount
    pub amt: f64,

    /// Fraud probability (0.0 - 1.0)
    pub risk_score: f64,

    /// Risk tier of the transaction
    pub risk_level: RiskTier,

    /// Action applied to the card
    pub action_taken: String,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl FraudAlert {
    /// Build an alert for a persisted record
    pub fn for_record(recipient: &str, record: &TransactionRecord) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            transaction_id: record.id,
            trans_date_trans_time: record.transaction.trans_date_trans_time.clone(),
            merchant: record.transaction.merchant.clone(),
            amt: record.transaction.amt,
            risk_score: record.result.risk_score,
            risk_level: record.result.risk_level,
            action_taken: record.result.action_taken.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Subject line for mail-style channels
    pub fn subject(&self) -> String {
        format!("URGENT: Fraud Detected - Transaction {}", self.transaction_id)
    }

    /// Plain-text body for mail-style channels
    pub fn body(&self) -> String {
        format!(
            "A high-risk transaction has been detected on your card.\n\n\
             Details:\n\
             - Date: {}\n\
             - Merchant: {}\n\
             - Amount: {}\n\
             - Risk Score: {:.2}%\n\n\
             Action Taken: CARD BLOCKED TEMPORARILY.\n\n\
             Please contact support if this was you.\n",
            self.trans_date_trans_time.as_deref().unwrap_or("N/A"),
            self.merchant,
            format_amount(self.amt),
            self.risk_score * 100.0,
        )
    }
}
