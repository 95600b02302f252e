//! End-to-end tests for the scoring service with hand-written collaborators

use async_trait::async_trait;
use card_risk_scoring::error::{ScoringError, ScoringResult};
use card_risk_scoring::feature_extractor::FEATURE_COUNT;
use card_risk_scoring::models::{
    ArtifactBundle, EncoderTable, RiskClassifier, RiskModel, ScalerParameters,
};
use card_risk_scoring::producer::AlertSink;
use card_risk_scoring::query::{self, QueryResponse};
use card_risk_scoring::report::TextReportRenderer;
use card_risk_scoring::storage::{InMemoryStore, TransactionStore};
use card_risk_scoring::types::{FraudAlert, NewRecord};
use card_risk_scoring::{
    FraudService, RawTransaction, RiskAction, RiskPolicy, RiskScorer, RiskTier, ScoringEngine,
    TransactionRecord,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const RECIPIENT: &str = "desk@example.com";

// ---- collaborators -------------------------------------------------------

/// Returns a probability keyed off the (unscaled) amount
struct AmountModel;

impl RiskModel for AmountModel {
    fn predict_proba(&self, features: &[f32]) -> anyhow::Result<f64> {
        // amt sits at index 2, scaled by 1000
        Ok((features[2] as f64).clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "amount"
    }
}

struct ChannelSink {
    tx: mpsc::UnboundedSender<FraudAlert>,
}

#[async_trait]
impl AlertSink for ChannelSink {
    async fn send(&self, alert: &FraudAlert) -> anyhow::Result<()> {
        self.tx.send(alert.clone())?;
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl AlertSink for FailingSink {
    async fn send(&self, _alert: &FraudAlert) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay refused connection")
    }
}

struct FailingStore;

#[async_trait]
impl TransactionStore for FailingStore {
    async fn append(&self, _record: NewRecord) -> ScoringResult<TransactionRecord> {
        Err(ScoringError::Storage("disk full".to_string()))
    }

    async fn get(&self, _id: u64) -> ScoringResult<Option<TransactionRecord>> {
        Ok(None)
    }

    async fn history(&self) -> ScoringResult<Vec<TransactionRecord>> {
        Ok(Vec::new())
    }
}

// ---- fixtures ------------------------------------------------------------

fn engine() -> ScoringEngine {
    let encoder = EncoderTable::from_classes(
        "v1",
        [
            ("merchant", vec!["fraud_merchant_1", "merchant_1", "merchant_2"]),
            ("category", vec!["grocery_pos", "shopping_net", "travel"]),
            ("gender", vec!["F", "M"]),
            ("job", vec!["Job_1", "Job_2"]),
        ],
        0,
    )
    .unwrap();
    let mean = vec![0.0; FEATURE_COUNT];
    let mut scale = vec![1.0; FEATURE_COUNT];
    scale[2] = 1000.0;
    let scaler = ScalerParameters::new("v1", mean, scale).unwrap();
    let classifier = RiskClassifier::new(Box::new(AmountModel));
    let bundle = ArtifactBundle::new(encoder, scaler, classifier).unwrap();

    ScoringEngine::Available(RiskScorer::new(Arc::new(bundle), RiskPolicy::default()))
}

fn service_with(
    engine: ScoringEngine,
    store: Arc<dyn TransactionStore>,
    alerts: Arc<dyn AlertSink>,
    report_dir: &Path,
) -> FraudService {
    FraudService::new(
        engine,
        store,
        alerts,
        Arc::new(TextReportRenderer::new(report_dir)),
        RECIPIENT,
    )
}

fn service(report_dir: &Path) -> (FraudService, mpsc::UnboundedReceiver<FraudAlert>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = service_with(
        engine(),
        Arc::new(InMemoryStore::new()),
        Arc::new(ChannelSink { tx }),
        report_dir,
    );
    (service, rx)
}

/// Amount maps directly to probability: $960 scores 0.96
fn transaction(merchant: &str, amt: f64) -> RawTransaction {
    RawTransaction::new(merchant, "travel", amt)
}

async fn no_alert(rx: &mut mpsc::UnboundedReceiver<FraudAlert>) -> bool {
    tokio::time::timeout(Duration::from_millis(100), rx.recv())
        .await
        .is_err()
}

// ---- prediction ----------------------------------------------------------

#[tokio::test]
async fn test_fraud_prediction_sends_alert() {
    let dir = tempfile::tempdir().unwrap();
    let (service, mut rx) = service(dir.path());

    let prediction = service
        .predict(transaction("fraud_merchant_1", 960.0))
        .await
        .unwrap();

    assert_eq!(prediction.id, 1);
    assert_eq!(prediction.result.risk_level, RiskTier::Fraud);
    assert_eq!(prediction.result.action_taken, RiskAction::CardBlocked);
    assert!(prediction.result.is_fraud);

    let alert = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("alert not dispatched")
        .expect("channel closed");
    assert_eq!(alert.transaction_id, 1);
    assert_eq!(alert.recipient, RECIPIENT);
    assert_eq!(alert.merchant, "fraud_merchant_1");
    assert_eq!(alert.risk_level, RiskTier::Fraud);
}

#[tokio::test]
async fn test_non_fraud_tiers_do_not_alert() {
    let dir = tempfile::tempdir().unwrap();
    let (service, mut rx) = service(dir.path());

    for (amt, tier) in [
        (100.0, RiskTier::RiskFree),
        (300.0, RiskTier::Low),
        (600.0, RiskTier::Medium),
        (900.0, RiskTier::High),
    ] {
        let prediction = service.predict(transaction("merchant_1", amt)).await.unwrap();
        assert_eq!(prediction.result.risk_level, tier);
    }

    assert!(no_alert(&mut rx).await);
    assert_eq!(service.history().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_ids_follow_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());

    let first = service.predict(transaction("merchant_1", 10.0)).await.unwrap();
    let second = service.predict(transaction("merchant_2", 20.0)).await.unwrap();

    assert_eq!((first.id, second.id), (1, 2));

    let history = service.history().await.unwrap();
    let merchants: Vec<_> = history
        .iter()
        .map(|r| r.transaction.merchant.as_str())
        .collect();
    assert_eq!(merchants, vec!["merchant_1", "merchant_2"]);
}

#[tokio::test]
async fn test_invalid_input_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());

    let err = service
        .predict(transaction("merchant_1", -5.0))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_input");
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_engine_refuses_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let store = Arc::new(InMemoryStore::new());
    let service = service_with(
        ScoringEngine::Unavailable("scaler.json missing".to_string()),
        store.clone(),
        Arc::new(ChannelSink { tx }),
        dir.path(),
    );

    assert!(!service.is_available());
    let err = service
        .predict(transaction("merchant_1", 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unavailable");
    assert!(store.history().await.unwrap().is_empty());

    // Queries keep working
    assert!(service.chat("stats").await.unwrap().contains("0 transactions"));
}

#[tokio::test]
async fn test_store_failure_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let service = service_with(
        engine(),
        Arc::new(FailingStore),
        Arc::new(ChannelSink { tx }),
        dir.path(),
    );

    let err = service
        .predict(transaction("fraud_merchant_1", 990.0))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "storage");
    assert!(no_alert(&mut rx).await);
}

#[tokio::test]
async fn test_alert_failure_does_not_fail_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let service = service_with(engine(), store.clone(), Arc::new(FailingSink), dir.path());

    let prediction = service
        .predict(transaction("fraud_merchant_1", 990.0))
        .await
        .unwrap();

    assert_eq!(prediction.result.risk_level, RiskTier::Fraud);
    assert_eq!(store.history().await.unwrap().len(), 1);
}

// ---- queries -------------------------------------------------------------

#[tokio::test]
async fn test_record_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());
    service.predict(transaction("merchant_2", 42.5)).await.unwrap();

    let record = service.record(1).await.unwrap();
    assert_eq!(record.transaction.merchant, "merchant_2");
    assert_eq!(record.transaction.amt, 42.5);

    let err = service.record(7).await.unwrap_err();
    assert!(matches!(err, ScoringError::NotFound(7)));
}

#[tokio::test]
async fn test_report_written_for_stored_record() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());
    service
        .predict(transaction("fraud_merchant_1", 970.0))
        .await
        .unwrap();

    let path = service.report(1).await.unwrap();
    assert_eq!(path, dir.path().join("report_1.txt"));

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.contains("Transaction Report ID: 1"));
    assert!(body.contains("Merchant: fraud_merchant_1"));
    assert!(body.contains("Assessment: FRAUD DETECTED"));
    assert!(body.contains("Action Taken: Card Blocked & Alert Sent"));

    assert!(matches!(
        service.report(2).await.unwrap_err(),
        ScoringError::NotFound(2)
    ));
}

#[tokio::test]
async fn test_chat_stats_reflect_history() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());

    service.predict(transaction("merchant_1", 50.0)).await.unwrap();
    service
        .predict(transaction("fraud_merchant_1", 980.0))
        .await
        .unwrap();
    service.predict(transaction("merchant_2", 70.0)).await.unwrap();

    let answer = service.chat("How many fraud cases?").await.unwrap();
    assert_eq!(
        answer,
        "I have analyzed 3 transactions in this session. 1 were detected as potential fraud."
    );
}

// ---- wire surface --------------------------------------------------------

#[tokio::test]
async fn test_transaction_payload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());

    let payload = serde_json::to_vec(&transaction("merchant_1", 250.0)).unwrap();
    let response = query::handle_transaction(&service, &payload).await;

    match response {
        QueryResponse::Prediction { id, result } => {
            assert_eq!(id, 1);
            assert_eq!(result.risk_level, RiskTier::Low);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_transaction_payload() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());

    let response = query::handle_transaction(&service, br#"{"merchant": "m"}"#).await;

    assert!(matches!(
        response,
        QueryResponse::Error { ref kind, ref message }
            if kind == "invalid_input" && message.contains("'category'")
    ));
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mistyped_field_is_named_in_reply() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());

    let mut value = serde_json::to_value(transaction("merchant_1", 10.0)).unwrap();
    value["city_pop"] = serde_json::json!(-5);
    let payload = serde_json::to_vec(&value).unwrap();

    match query::handle_transaction(&service, &payload).await {
        QueryResponse::Error { kind, message } => {
            assert_eq!(kind, "invalid_input");
            assert!(message.starts_with("invalid input for field 'city_pop'"));
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _rx) = service(dir.path());
    service.predict(transaction("merchant_1", 10.0)).await.unwrap();

    let history = query::handle_query(&service, br#"{"type": "history"}"#).await;
    assert!(matches!(history, QueryResponse::History { ref records } if records.len() == 1));

    let missing = query::handle_query(&service, br#"{"type": "record", "id": 5}"#).await;
    assert!(matches!(missing, QueryResponse::Error { ref kind, .. } if kind == "not_found"));

    let chat = query::handle_query(&service, br#"{"type": "chat", "query": "stats"}"#).await;
    assert!(matches!(chat, QueryResponse::Chat { ref response } if response.contains("1 transactions")));

    let bogus = query::handle_query(&service, b"not json").await;
    assert!(matches!(bogus, QueryResponse::Error { ref kind, .. } if kind == "invalid_request"));
}
