//! Request metrics shared by all VUs

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Samples {
    latencies_ms: Vec<f64>,
    failed: u64,
    iterations: u64,
    max_vus: u32,
}

/// Collector handed to every VU; clones share the same samples.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    samples: Arc<Mutex<Samples>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request
    pub fn record_request(&self, latency: Duration, ok: bool) {
        let mut samples = self.samples.lock();
        samples.latencies_ms.push(latency.as_secs_f64() * 1000.0);
        if !ok {
            samples.failed += 1;
        }
    }

    pub fn record_iteration(&self) {
        self.samples.lock().iterations += 1;
    }

    pub fn observe_vus(&self, active: u32) {
        let mut samples = self.samples.lock();
        samples.max_vus = samples.max_vus.max(active);
    }

    pub fn requests(&self) -> u64 {
        self.samples.lock().latencies_ms.len() as u64
    }

    /// Summarize everything recorded so far over a run of `elapsed`.
    pub fn summary(&self, endpoint: &str, elapsed: Duration) -> LoadSummary {
        let samples = self.samples.lock();
        let requests = samples.latencies_ms.len() as u64;
        let secs = elapsed.as_secs_f64();

        LoadSummary {
            endpoint: endpoint.to_string(),
            duration_ms: elapsed.as_millis() as u64,
            requests,
            request_rate: if secs > 0.0 { requests as f64 / secs } else { 0.0 },
            failed: samples.failed,
            failure_rate: if requests > 0 {
                samples.failed as f64 / requests as f64
            } else {
                0.0
            },
            iterations: samples.iterations,
            max_vus: samples.max_vus,
            latency: LatencyStats::from_samples(&samples.latencies_ms),
        }
    }
}

/// Request latency distribution in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub avg: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
}

impl LatencyStats {
    /// All zero for an empty sample set.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            min: sorted[0],
            avg: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Outcome of a load run
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub endpoint: String,
    pub duration_ms: u64,
    pub requests: u64,
    /// Requests per second over the whole run
    pub request_rate: f64,
    pub failed: u64,
    pub failure_rate: f64,
    pub iterations: u64,
    pub max_vus: u32,
    pub latency: LatencyStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_rank_percentiles() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        let stats = LatencyStats::from_samples(&samples);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.median, 50.0);
        assert_eq!(stats.p90, 90.0);
        assert_eq!(stats.p95, 95.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.avg, 50.5);
    }

    #[test]
    fn test_small_sample_percentiles() {
        let stats = LatencyStats::from_samples(&[30.0, 10.0, 20.0]);
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.p95, 30.0);
        assert_eq!(LatencyStats::from_samples(&[]), LatencyStats::default());
    }

    #[test]
    fn test_summary_rates() {
        let metrics = Metrics::new();
        for i in 0..10 {
            metrics.record_request(Duration::from_millis(10), i % 5 != 0);
            metrics.record_iteration();
        }
        metrics.observe_vus(3);
        metrics.observe_vus(2);

        let summary = metrics.summary("/", Duration::from_secs(2));
        assert_eq!(summary.requests, 10);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failure_rate, 0.2);
        assert_eq!(summary.request_rate, 5.0);
        assert_eq!(summary.iterations, 10);
        assert_eq!(summary.max_vus, 3);
        assert!((summary.latency.avg - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run_has_no_rates() {
        let summary = Metrics::new().summary("/", Duration::ZERO);
        assert_eq!(summary.request_rate, 0.0);
        assert_eq!(summary.failure_rate, 0.0);
    }
}
