//! Decision statistics for the risk fusion engine.

use crate::types::verdict::{ClassLabel, Novelty, Verdict};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for engine decisions
pub struct EngineMetrics {
    /// Total transactions analyzed
    pub decisions: AtomicU64,
    /// Total fraud verdicts
    pub fraud_verdicts: AtomicU64,
    /// Verdicts where the classifier said fraud
    pub classifier_hits: AtomicU64,
    /// Verdicts where the novelty detector said outlier
    pub novelty_hits: AtomicU64,
    /// Verdicts where the geo score forced fraud
    pub geo_jump_hits: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            decisions: AtomicU64::new(0),
            fraud_verdicts: AtomicU64::new(0),
            classifier_hits: AtomicU64::new(0),
            novelty_hits: AtomicU64::new(0),
            geo_jump_hits: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one completed decision
    pub fn record_decision(&self, processing_time: Duration, verdict: &Verdict, geo_forced: bool) {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        if verdict.is_fraud {
            self.fraud_verdicts.fetch_add(1, Ordering::Relaxed);
        }
        if verdict.signals.classifier_label == ClassLabel::Fraud {
            self.classifier_hits.fetch_add(1, Ordering::Relaxed);
        }
        if verdict.signals.novelty == Novelty::Outlier {
            self.novelty_hits.fetch_add(1, Ordering::Relaxed);
        }
        if geo_forced {
            self.geo_jump_hits.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (verdict.fraud_probability / 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Decisions per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.decisions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let decisions = self.decisions.load(Ordering::Relaxed);
        let frauds = self.fraud_verdicts.load(Ordering::Relaxed);
        let fraud_rate = if decisions > 0 {
            (frauds as f64 / decisions as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              RISK FUSION ENGINE - DECISION SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Decisions: {:>8}  │  Throughput: {:>8.1} tx/s              ║",
            decisions,
            self.get_throughput()
        );
        info!(
            "║ Fraud verdicts: {:>8}  │  Fraud rate: {:>6.1}%              ║",
            frauds, fraud_rate
        );
        info!(
            "║ Signals: classifier={:>6} novelty={:>6} geo_jump={:>6}       ║",
            self.classifier_hits.load(Ordering::Relaxed),
            self.novelty_hits.load(Ordering::Relaxed),
            self.geo_jump_hits.load(Ordering::Relaxed)
        );
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Probability Distribution:                              ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:<3}%: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
