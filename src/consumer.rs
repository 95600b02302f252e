//! NATS subscriptions for transactions and queries

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes to the subjects the service answers on
pub struct TransactionConsumer {
    client: Client,
    transaction_subject: String,
    query_subject: String,
}

impl TransactionConsumer {
    /// Create a new consumer
    pub fn new(client: Client, transaction_subject: &str, query_subject: &str) -> Self {
        Self {
            client,
            transaction_subject: transaction_subject.to_string(),
            query_subject: query_subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe_transactions(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(self.transaction_subject.clone())
            .await?;
        info!(subject = %self.transaction_subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Subscribe to the query subject
    pub async fn subscribe_queries(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.query_subject.clone()).await?;
        info!(subject = %self.query_subject, "Subscribed to query subject");
        Ok(subscriber)
    }

    pub fn transaction_subject(&self) -> &str {
        &self.transaction_subject
    }

    pub fn query_subject(&self) -> &str {
        &self.query_subject
    }
}
