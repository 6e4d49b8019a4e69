use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::utils::{mean, percentile};

/// Outcome of one request issued during the measurement phase
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub start_time: Instant,
    pub end_time: Instant,
    pub latency_ms: f64,
    pub success: bool,
    pub error: Option<String>,
}

impl RequestResult {
    /// Build a result from a completed round trip
    ///
    /// Latency is truncated to whole microseconds and expressed in
    /// milliseconds.
    pub fn new<E: std::fmt::Display>(
        start_time: Instant,
        end_time: Instant,
        outcome: Result<(), E>,
    ) -> Self {
        let elapsed = end_time.saturating_duration_since(start_time);
        let (success, error) = match outcome {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };

        Self {
            start_time,
            end_time,
            latency_ms: elapsed.as_micros() as f64 / 1000.0,
            success,
            error,
        }
    }
}

/// Aggregated statistics for one measurement phase
///
/// Latency fields are milliseconds computed over successful requests only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub rps: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub error_rate: f64,
}

/// Accumulates request results and aggregates them once the phase is over
///
/// The collector itself is single-owner. Concurrent workers reach it through
/// a bounded channel drained by one task (see [`ResultCollector::drain`]).
#[derive(Debug, Default)]
pub struct ResultCollector {
    results: Vec<RequestResult>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self {
            results: Vec::with_capacity(10_000),
        }
    }

    pub fn add(&mut self, result: RequestResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[RequestResult] {
        &self.results
    }

    /// Absorb results until every sender is dropped and the channel is empty
    ///
    /// Returning from this future means no result can still be in flight.
    pub async fn drain(mut self, mut rx: tokio::sync::mpsc::Receiver<RequestResult>) -> Self {
        while let Some(result) = rx.recv().await {
            self.add(result);
        }
        self
    }

    /// Compute statistics over everything collected so far
    ///
    /// `duration` is the configured measurement window; it is the divisor
    /// for requests per second.
    pub fn aggregate(&self, duration: Duration) -> AggregatedStats {
        if self.results.is_empty() {
            return AggregatedStats::default();
        }

        let mut latencies: Vec<f64> = self
            .results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.latency_ms)
            .collect();
        let successful = latencies.len();
        let total = self.results.len();
        let failed = total - successful;

        let secs = duration.as_secs_f64();
        let mut stats = AggregatedStats {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            rps: if secs > 0.0 { successful as f64 / secs } else { 0.0 },
            error_rate: failed as f64 / total as f64,
            ..Default::default()
        };

        if latencies.is_empty() {
            return stats;
        }

        latencies.sort_by(|a, b| a.total_cmp(b));

        stats.p50 = percentile(&latencies, 50.0);
        stats.p90 = percentile(&latencies, 90.0);
        stats.p95 = percentile(&latencies, 95.0);
        stats.p99 = percentile(&latencies, 99.0);
        stats.min = latencies[0];
        stats.max = latencies[latencies.len() - 1];
        stats.mean = mean(&latencies);

        stats
    }
}
