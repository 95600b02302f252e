//! Request/response envelopes for the NATS query surface

use crate::error::{ScoringError, ScoringResult};
use crate::service::{FraudService, Prediction};
use crate::types::record::TransactionRecord;
use crate::types::risk::RiskResult;
use crate::types::transaction::RawTransaction;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Queries accepted on the query subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryRequest {
    History,
    Record { id: u64 },
    Report { id: u64 },
    Chat { query: String },
}

/// Replies sent back to the requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResponse {
    Prediction { id: u64, result: RiskResult },
    History { records: Vec<TransactionRecord> },
    Record { record: TransactionRecord },
    Report { id: u64, path: String },
    Chat { response: String },
    Error { kind: String, message: String },
}

impl From<ScoringError> for QueryResponse {
    fn from(err: ScoringError) -> Self {
        QueryResponse::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ScoringResult<Prediction>> for QueryResponse {
    fn from(result: ScoringResult<Prediction>) -> Self {
        match result {
            Ok(Prediction { id, result }) => QueryResponse::Prediction { id, result },
            Err(err) => err.into(),
        }
    }
}

impl QueryResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        // Every variant holds plain data; serialization cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Decode a transaction payload and score it
pub async fn handle_transaction(service: &FraudService, payload: &[u8]) -> QueryResponse {
    match RawTransaction::from_json(payload) {
        Ok(transaction) => service.predict(transaction).await.into(),
        Err(e) => {
            warn!(error = %e, "Failed to deserialize transaction");
            e.into()
        }
    }
}

/// Decode a query payload and answer it
pub async fn handle_query(service: &FraudService, payload: &[u8]) -> QueryResponse {
    match serde_json::from_slice::<QueryRequest>(payload) {
        Ok(request) => answer(service, request).await,
        Err(e) => {
            warn!(error = %e, "Failed to deserialize query");
            QueryResponse::Error {
                kind: "invalid_request".to_string(),
                message: e.to_string(),
            }
        }
    }
}

async fn answer(service: &FraudService, request: QueryRequest) -> QueryResponse {
    let response = match request {
        QueryRequest::History => service
            .history()
            .await
            .map(|records| QueryResponse::History { records }),
        QueryRequest::Record { id } => service
            .record(id)
            .await
            .map(|record| QueryResponse::Record { record }),
        QueryRequest::Report { id } => service.report(id).await.map(|path| QueryResponse::Report {
            id,
            path: path.display().to_string(),
        }),
        QueryRequest::Chat { query } => service
            .chat(&query)
            .await
            .map(|response| QueryResponse::Chat { response }),
    };

    response.unwrap_or_else(QueryResponse::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request: QueryRequest = serde_json::from_str(r#"{"type": "report", "id": 4}"#).unwrap();
        assert_eq!(request, QueryRequest::Report { id: 4 });

        let request: QueryRequest = serde_json::from_str(r#"{"type": "history"}"#).unwrap();
        assert_eq!(request, QueryRequest::History);

        assert!(serde_json::from_str::<QueryRequest>(r#"{"type": "delete"}"#).is_err());
    }

    #[test]
    fn test_error_response_wire_format() {
        let response: QueryResponse = ScoringError::NotFound(9).into();
        let value: serde_json::Value = serde_json::from_slice(&response.to_bytes()).unwrap();

        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "not_found");
        assert_eq!(value["message"], "transaction 9 not found");
    }
}
