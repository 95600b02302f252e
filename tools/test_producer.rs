//! Test Transaction Producer
//!
//! Generates and publishes card transactions to NATS for pipeline testing.
//! Fraud-shaped transactions cluster on a few merchants, carry higher amounts
//! and sit further away from the cardholder.

use card_risk_scoring::query::QueryResponse;
use card_risk_scoring::RawTransaction;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const CATEGORIES: [&str; 13] = [
    "grocery_pos",
    "entertainment",
    "shopping_pos",
    "misc_pos",
    "shopping_net",
    "gas_transport",
    "personal_care",
    "health_fitness",
    "travel",
    "kids_pets",
    "grocery_net",
    "food_dining",
    "home",
];

const STATES: [&str; 5] = ["TX", "NY", "CA", "FL", "IL"];

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a transaction; `suspicious` shapes it like fraud
    fn generate(&mut self, suspicious: bool) -> RawTransaction {
        let merchant = if suspicious {
            format!("fraud_merchant_{}", self.rng.gen_range(0..10))
        } else if self.rng.gen_bool(0.1) {
            format!("fraud_merchant_{}", self.rng.gen_range(0..50))
        } else {
            format!("merchant_{}", self.rng.gen_range(0..500))
        };

        let base_amount = self.exponential(50.0);
        let amt = ((base_amount + if suspicious { 200.0 } else { 0.0 }) * 100.0).round() / 100.0;

        let lat = 35.0 + self.normal(2.0);
        let long = -95.0 + self.normal(2.0);
        let spread = if suspicious { 1.0 } else { 0.02 };

        let when = Utc::now() - ChronoDuration::seconds(self.rng.gen_range(0..86_400));

        RawTransaction {
            trans_date_trans_time: Some(when.format("%Y-%m-%d %H:%M:%S").to_string()),
            merchant,
            category: self.random_choice(&CATEGORIES).to_string(),
            amt,
            gender: self.random_choice(&["M", "F"]).to_string(),
            state: self.random_choice(&STATES).to_string(),
            job: format!("Job_{}", self.rng.gen_range(1..=100)),
            city_pop: self.rng.gen_range(5_000..=1_000_000),
            lat,
            long,
            merch_lat: lat + self.normal(spread),
            merch_lon: long + self.normal(spread),
        }
    }

    fn exponential(&mut self, mean: f64) -> f64 {
        let u: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        -mean * u.ln()
    }

    /// Box-Muller
    fn normal(&mut self, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let wait_for_reply = args.get(6).is_some_and(|s| s == "request");

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        wait_for_reply = wait_for_reply,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} transactions...", count);

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let suspicious = rng.gen_bool(fraud_rate);
        if suspicious {
            suspicious_count += 1;
        } else {
            legitimate_count += 1;
        }
        let transaction = generator.generate(suspicious);
        let payload = serde_json::to_vec(&transaction)?;

        if wait_for_reply {
            let reply = client.request(subject.to_string(), payload.into()).await?;
            match serde_json::from_slice::<QueryResponse>(&reply.payload) {
                Ok(QueryResponse::Prediction { id, result }) => info!(
                    id = id,
                    merchant = %transaction.merchant,
                    suspicious = suspicious,
                    risk_score = result.risk_score,
                    risk_level = %result.risk_level,
                    "Scored"
                ),
                Ok(other) => warn!(response = ?other, "Scoring failed"),
                Err(e) => warn!(error = %e, "Unreadable reply"),
            }
        } else {
            client.publish(subject.to_string(), payload.into()).await?;
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} transactions ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;

    info!(
        "Completed! Published {} transactions ({} legitimate, {} suspicious)",
        count, legitimate_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = generator.generate(rng.gen_bool(fraud_rate));
        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
