//! Card Risk Scoring Service - Main Entry Point
//!
//! Scores transactions posted on NATS, answers history/report/chat queries
//! and dispatches fraud alerts.

use anyhow::Result;
use async_nats::{Client, Message};
use card_risk_scoring::{
    config::{AlertChannel, AppConfig, LoggingConfig, ReportFormat, ReportsConfig},
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    models::ArtifactLoader,
    producer::{AlertProducer, AlertSink, LogAlertSink},
    query::{self, QueryResponse},
    report::{PdfReportRenderer, ReportRenderer, TextReportRenderer},
    scoring::RiskScorer,
    service::{FraudService, ScoringEngine},
    storage::{InMemoryStore, TransactionStore},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Message received on one of the served subjects
enum Incoming {
    Transaction(Message),
    Query(Message),
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Card Risk Scoring Service");
    info!(
        "Risk tiers: low>={:.2}, medium>={:.2}, high>={:.2}, fraud>={:.2}",
        config.policy.low, config.policy.medium, config.policy.high, config.policy.fraud
    );

    // A bundle that fails to load disables scoring; queries keep working
    let engine = match ArtifactLoader::with_threads(config.artifacts.onnx_threads)
        .and_then(|loader| loader.load(&config.artifacts))
    {
        Ok(bundle) => {
            ScoringEngine::Available(RiskScorer::new(Arc::new(bundle), config.policy))
        }
        Err(e) => {
            error!(
                error = %format!("{:#}", e),
                dir = %config.artifacts.dir.display(),
                "Artifact bundle failed to load, scoring unavailable"
            );
            ScoringEngine::Unavailable(format!("{:#}", e))
        }
    };

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let store: Arc<dyn TransactionStore> = Arc::new(InMemoryStore::new());
    let alerts: Arc<dyn AlertSink> = match config.alerting.channel {
        AlertChannel::Nats => {
            info!("Publishing alerts to: {}", config.nats.alert_subject);
            Arc::new(AlertProducer::new(client.clone(), &config.nats.alert_subject))
        }
        AlertChannel::Log => {
            warn!("Alert channel is 'log', fraud alerts will not be delivered");
            Arc::new(LogAlertSink)
        }
    };
    let reports = report_renderer(&config.reports);

    let service = Arc::new(FraudService::new(
        engine,
        store.clone(),
        alerts,
        reports,
        &config.alerting.recipient,
    ));

    let metrics = Arc::new(PipelineMetrics::new());
    let reporter = MetricsReporter::new(
        metrics.clone(),
        store.clone(),
        config.pipeline.metrics_interval_secs,
    );
    tokio::spawn(reporter.start());

    let consumer = TransactionConsumer::new(
        client.clone(),
        &config.nats.transaction_subject,
        &config.nats.query_subject,
    );
    let transactions = consumer.subscribe_transactions().await?;
    let queries = consumer.subscribe_queries().await?;
    let mut incoming = futures::stream::select(
        transactions.map(Incoming::Transaction),
        queries.map(Incoming::Query),
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(config.pipeline.workers));
    info!(
        workers = config.pipeline.workers,
        scoring_available = service.is_available(),
        "Processing loop started"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let message = tokio::select! {
            message = incoming.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        };

        let permit = semaphore.clone().acquire_owned().await?;
        let service = service.clone();
        let metrics = metrics.clone();
        let client = client.clone();

        tokio::spawn(async move {
            handle_message(&service, &client, &metrics, message).await;
            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary(store.as_ref()).await;

    Ok(())
}

async fn handle_message(
    service: &FraudService,
    client: &Client,
    metrics: &PipelineMetrics,
    incoming: Incoming,
) {
    let start_time = Instant::now();

    let (message, response) = match incoming {
        Incoming::Transaction(message) => {
            let response = query::handle_transaction(service, &message.payload).await;
            (message, response)
        }
        Incoming::Query(message) => {
            let response = query::handle_query(service, &message.payload).await;
            (message, response)
        }
    };

    let succeeded = !matches!(response, QueryResponse::Error { .. });
    if let QueryResponse::Error { kind, message: reason } = &response {
        warn!(kind = %kind, reason = %reason, subject = %message.subject, "Request failed");
    }
    metrics.record(start_time.elapsed(), succeeded);

    match message.reply {
        Some(reply) => {
            if let Err(e) = client.publish(reply, response.to_bytes().into()).await {
                error!(error = %e, "Failed to publish reply");
            }
        }
        None => debug!(subject = %message.subject, "No reply subject, response dropped"),
    }
}

fn report_renderer(reports: &ReportsConfig) -> Arc<dyn ReportRenderer> {
    match reports.format {
        ReportFormat::Pdf => {
            match PdfReportRenderer::new(reports.dir.clone(), reports.font_dir.as_deref()) {
                Ok(renderer) => {
                    info!("Writing PDF reports to: {}", reports.dir.display());
                    return Arc::new(renderer);
                }
                Err(e) => warn!(
                    error = %format!("{:#}", e),
                    "PDF reports unavailable, falling back to plain text"
                ),
            }
        }
        ReportFormat::Text => info!("Writing text reports to: {}", reports.dir.display()),
    }
    Arc::new(TextReportRenderer::new(reports.dir.clone()))
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("card_risk_scoring={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
