use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::models::dsl_model::RunConfig;
use crate::utils::hardware::HostInfo;

/// Result of one iteration of a virtual user.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub status: Option<u16>,
    pub passed: bool,
    pub latency_ms: f64,
    pub bytes_received: u64,
    /// Breakdown label when no status was obtained (`"TIMEOUT"`, `"CONNECTION_ERROR"`, ...).
    pub error: Option<&'static str>,
}

impl RequestOutcome {
    pub fn response(status: u16, expected: u16, latency_ms: f64, bytes_received: u64) -> Self {
        Self {
            status: Some(status),
            passed: status == expected,
            latency_ms,
            bytes_received,
            error: None,
        }
    }

    pub fn failure(label: &'static str, latency_ms: f64) -> Self {
        Self {
            status: None,
            passed: false,
            latency_ms,
            bytes_received: 0,
            error: Some(label),
        }
    }

    fn breakdown_key(&self) -> String {
        match (self.status, self.error) {
            (Some(status), _) => status.to_string(),
            (None, Some(label)) => label.to_string(),
            (None, None) => "UNKNOWN".to_string(),
        }
    }
}

/// Shared accumulator the VUs write into while a run is in progress.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_requests: AtomicU64,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
    bytes_received: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
    response_times: Mutex<Vec<f64>>,
    status_counts: Mutex<HashMap<String, u64>>,
}

/// Decrements the in-flight gauge when the request finishes, however it finishes.
pub struct InFlightGuard<'a> {
    collector: &'a MetricsCollector,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.collector.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_request(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(now, Ordering::AcqRel);
        InFlightGuard { collector: self }
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if outcome.passed {
            self.checks_passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_received
            .fetch_add(outcome.bytes_received, Ordering::Relaxed);

        lock(&self.response_times).push(outcome.latency_ms);
        *lock(&self.status_counts)
            .entry(outcome.breakdown_key())
            .or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::Acquire)
    }

    /// Freezes the collected data into the report for `config`.
    pub fn finalize(&self, config: &RunConfig, elapsed: Duration, host: HostInfo) -> Metrics {
        let total_requests = self.total_requests();
        let checks_passed = self.checks_passed.load(Ordering::Relaxed);
        let checks_failed = self.checks_failed.load(Ordering::Relaxed);
        let elapsed_secs = elapsed.as_secs_f64();

        let latency = LatencySummary::from_samples(&lock(&self.response_times));

        Metrics {
            name: config.name.clone(),
            target_url: config.target.clone(),
            vus: config.vus,
            duration_secs: config.duration,
            max_rps: config.rps,
            expected_status: config.expected_status,
            total_requests,
            checks_passed,
            checks_failed,
            pass_rate: if total_requests == 0 {
                0.0
            } else {
                checks_passed as f64 / total_requests as f64
            },
            latency,
            throughput: if elapsed_secs > 0.0 {
                total_requests as f64 / elapsed_secs
            } else {
                0.0
            },
            elapsed_secs,
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            max_in_flight: self.max_in_flight(),
            timestamp: chrono::Local::now().format("%Y/%m/%d %H:%M:%S").to_string(),
            status_counts: lock(&self.status_counts).clone(),
            host,
        }
    }
}

/// Response time distribution in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min: f64,
    pub avg: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
}

impl LatencySummary {
    pub fn from_samples(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

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

/// Linear-interpolated percentile over an ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = pct / 100.0 * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub name: String,
    pub target_url: String,
    pub vus: u64,
    pub duration_secs: u64,
    pub max_rps: u64,
    pub expected_status: u16,

    pub total_requests: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub pass_rate: f64,

    pub latency: LatencySummary,
    pub throughput: f64,
    pub elapsed_secs: f64,
    pub bytes_received: u64,
    pub max_in_flight: u64,

    pub timestamp: String,

    pub status_counts: HashMap<String, u64>,
    pub host: HostInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_matches_even_and_odd_lengths() {
        assert_eq!(LatencySummary::from_samples(&[3.0, 1.0, 2.0]).median, 2.0);
        assert_eq!(LatencySummary::from_samples(&[4.0, 1.0, 3.0, 2.0]).median, 2.5);
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        assert_eq!(LatencySummary::from_samples(&[]), LatencySummary::default());
    }

    #[test]
    fn percentiles_interpolate() {
        let samples: Vec<f64> = (1..=101).map(f64::from).collect();
        let summary = LatencySummary::from_samples(&samples);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 101.0);
        assert_eq!(summary.avg, 51.0);
        assert_eq!(summary.p90, 91.0);
        assert_eq!(summary.p95, 96.0);
    }

    #[test]
    fn check_passes_only_on_expected_status() {
        assert!(RequestOutcome::response(200, 200, 1.0, 0).passed);
        assert!(!RequestOutcome::response(500, 200, 1.0, 0).passed);
        assert!(!RequestOutcome::failure("TIMEOUT", 1.0).passed);
    }

    #[test]
    fn collector_tallies_outcomes() {
        let collector = MetricsCollector::new();
        collector.record(&RequestOutcome::response(200, 200, 10.0, 5));
        collector.record(&RequestOutcome::response(200, 200, 30.0, 5));
        collector.record(&RequestOutcome::response(500, 200, 20.0, 0));
        collector.record(&RequestOutcome::failure("CONNECTION_ERROR", 1.0));

        let config = RunConfig { duration: 2, ..RunConfig::default() };
        let metrics = collector.finalize(&config, Duration::from_secs(2), HostInfo::default());

        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.checks_passed, 2);
        assert_eq!(metrics.checks_failed, 2);
        assert_eq!(metrics.pass_rate, 0.5);
        assert_eq!(metrics.throughput, 2.0);
        assert_eq!(metrics.bytes_received, 10);
        assert_eq!(metrics.status_counts.get("200"), Some(&2));
        assert_eq!(metrics.status_counts.get("500"), Some(&1));
        assert_eq!(metrics.status_counts.get("CONNECTION_ERROR"), Some(&1));
        assert_eq!(metrics.latency.max, 30.0);
    }

    #[test]
    fn in_flight_gauge_tracks_peak() {
        let collector = MetricsCollector::new();
        {
            let _a = collector.begin_request();
            let _b = collector.begin_request();
            assert_eq!(collector.max_in_flight(), 2);
        }
        let _c = collector.begin_request();
        assert_eq!(collector.max_in_flight(), 2);
    }

    #[test]
    fn counters_survive_concurrent_writers() {
        let collector = std::sync::Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        collector.record(&RequestOutcome::response(200, 200, 1.0, 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(collector.total_requests(), 8000);
    }
}
