//! Serving-layer latency and throughput telemetry.
//!
//! Only timing samples live here. Risk distribution and fraud counts are
//! read from the transaction store when a summary is printed.

use crate::policy::RiskTier;
use crate::storage::{HistorySummary, TransactionStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Samples kept for percentile computation
const MAX_SAMPLES: usize = 10_000;

/// Latency collector for handled messages
pub struct PipelineMetrics {
    /// Messages handled, successful or not
    messages_handled: AtomicU64,
    /// Messages answered with an error
    messages_failed: AtomicU64,
    /// Handling times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            messages_handled: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record one handled message
    pub fn record(&self, processing_time: Duration, succeeded: bool) {
        self.messages_handled.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.messages_failed.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    pub fn messages_handled(&self) -> u64 {
        self.messages_handled.load(Ordering::Relaxed)
    }

    pub fn messages_failed(&self) -> u64 {
        self.messages_failed.load(Ordering::Relaxed)
    }

    /// Get processing time statistics
    pub fn processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) => times.clone(),
            Err(_) => return ProcessingStats::default(),
        };
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (messages per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.messages_handled() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics, reading tier counts from the store
    pub async fn print_summary(&self, store: &dyn TransactionStore) {
        let processing = self.processing_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              RISK SCORING SERVICE - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Messages Handled: {:>8}  │  Throughput: {:>6.1} msg/s      ║",
            self.messages_handled(),
            self.throughput()
        );
        info!(
            "║ Failed:           {:>8}                                   ║",
            self.messages_failed()
        );
        info!(
            "║ Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}        ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );

        match store.history().await {
            Ok(records) => {
                let summary = HistorySummary::from_records(&records);
                info!("╠══════════════════════════════════════════════════════════════╣");
                info!("║ Risk Tiers ({} records):", summary.total);
                for tier in RiskTier::ALL {
                    let count = summary.count(tier);
                    let pct = if summary.total > 0 {
                        count as f64 / summary.total as f64 * 100.0
                    } else {
                        0.0
                    };
                    let bar = "█".repeat(((pct / 5.0) as usize).min(20));
                    info!("║   {:<12}: {:>6} ({:>5.1}%) {}", tier.label(), count, pct, bar);
                }
            }
            Err(e) => warn!(error = %e, "Could not read history for metrics summary"),
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    store: Arc<dyn TransactionStore>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(
        metrics: Arc<PipelineMetrics>,
        store: Arc<dyn TransactionStore>,
        interval_secs: u64,
    ) -> Self {
        Self {
            metrics,
            store,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary(self.store.as_ref()).await;
        }
    }
}
