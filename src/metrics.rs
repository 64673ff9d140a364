//! Assessment throughput and outcome statistics

use crate::types::verdict::Verdict;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Keep at most this many latency samples
const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for the assessment service
pub struct AssessmentMetrics {
    /// Total assessments classified
    pub assessments_processed: AtomicU64,
    /// Assessments classified as high risk
    pub high_risk: AtomicU64,
    /// Submissions rejected before classification
    pub rejected: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl AssessmentMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            assessments_processed: AtomicU64::new(0),
            high_risk: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a classified assessment
    pub fn record_assessment(&self, processing_time: Duration, verdict: &Verdict) {
        self.assessments_processed.fetch_add(1, Ordering::Relaxed);
        if verdict.positive {
            self.high_risk.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }

        if let Some(p) = verdict.probability {
            let bucket = ((p * 10.0) as usize).min(9);
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a rejected submission
    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
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

    /// Get current throughput (assessments per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.assessments_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or([0; 10])
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let processed = self.assessments_processed.load(Ordering::Relaxed);
        let high_risk = self.high_risk.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let high_risk_rate = if processed > 0 {
            (high_risk as f64 / processed as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let distribution = self.get_probability_distribution();

        info!(
            processed = processed,
            high_risk = high_risk,
            high_risk_rate = format!("{:.1}%", high_risk_rate),
            rejected = rejected,
            throughput = format!("{:.2}/s", self.get_throughput()),
            "Assessment summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );

        let total: u64 = distribution.iter().sum();
        if total > 0 {
            for (i, &count) in distribution.iter().enumerate() {
                let pct = (count as f64 / total as f64) * 100.0;
                let bar = "█".repeat(((pct / 5.0) as usize).min(20));
                info!(
                    "  p {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct,
                    bar
                );
            }
        }
    }
}

impl Default for AssessmentMetrics {
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

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<AssessmentMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<AssessmentMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = AssessmentMetrics::new();

        metrics.record_assessment(Duration::from_micros(100), &Verdict::new(true, Some(0.87)));
        metrics.record_assessment(Duration::from_micros(300), &Verdict::new(false, None));
        metrics.record_rejection();

        assert_eq!(metrics.assessments_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.high_risk.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rejected.load(Ordering::Relaxed), 1);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 200);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = AssessmentMetrics::new();

        metrics.record_assessment(Duration::from_micros(1), &Verdict::new(true, Some(0.87)));
        metrics.record_assessment(Duration::from_micros(1), &Verdict::new(true, Some(1.0)));
        metrics.record_assessment(Duration::from_micros(1), &Verdict::new(false, Some(0.05)));
        metrics.record_assessment(Duration::from_micros(1), &Verdict::new(false, None));

        let dist = metrics.get_probability_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[8], 1);
        assert_eq!(dist[9], 1);
        assert_eq!(dist.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_empty_stats() {
        let stats = AssessmentMetrics::new().get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_us, 0);
    }
}
