use crate::{
    benchmark::RunConfig,
    cli::Protocol,
    metrics::AggregatedStats,
    utils::{format_duration, format_latency_ms, format_percent, format_rate},
    workload::Mode,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Result document written once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub run_id: Uuid,
    pub protocol: Protocol,
    pub mode: Mode,
    pub work_factor: u32,
    pub payload_size_bytes: u32,
    pub concurrency: usize,
    pub duration_seconds: f64,
    pub warmup_duration_seconds: f64,
    pub stats: AggregatedStats,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub system_info: SystemInfo,
}

/// System information for reproducibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
        }
    }
}

impl BenchmarkResult {
    /// Stamp aggregated statistics with the configuration that produced them
    pub fn new(config: &RunConfig, stats: AggregatedStats) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            protocol: config.protocol,
            mode: config.mode,
            work_factor: config.work_factor,
            payload_size_bytes: config.payload_size_bytes,
            concurrency: config.concurrency,
            duration_seconds: config.duration.as_secs_f64(),
            warmup_duration_seconds: config.warmup_duration.as_secs_f64(),
            stats,
            timestamp: chrono::Utc::now(),
            version: crate::VERSION.to_string(),
            system_info: SystemInfo::default(),
        }
    }

    /// Whether any measured request failed
    pub fn has_failures(&self) -> bool {
        self.stats.failed_requests > 0
    }

    /// Write the document as pretty-printed JSON, replacing any existing file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize results")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {:?}", path))?;

        info!("Results written to: {:?}", path);
        Ok(())
    }

    /// Log the human-readable run summary
    pub fn log_summary(&self) {
        let stats = &self.stats;

        info!("-----------------------------------------------------------------");
        info!("Results: {} / {} (run {})", self.protocol, self.mode, self.run_id);
        info!("-----------------------------------------------------------------");
        info!(
            "  Requests:   {} total, {} succeeded, {} failed ({} errors)",
            stats.total_requests,
            stats.successful_requests,
            stats.failed_requests,
            format_percent(stats.error_rate)
        );
        info!("  Throughput: {}", format_rate(stats.rps));
        info!(
            "  Latency:    mean {}, min {}, max {}",
            format_latency_ms(stats.mean),
            format_latency_ms(stats.min),
            format_latency_ms(stats.max)
        );
        info!(
            "  Percentiles: p50 {}, p90 {}, p95 {}, p99 {}",
            format_latency_ms(stats.p50),
            format_latency_ms(stats.p90),
            format_latency_ms(stats.p95),
            format_latency_ms(stats.p99)
        );
        info!(
            "  Window:     {} measured after {} warmup",
            format_duration(std::time::Duration::from_secs_f64(self.duration_seconds)),
            format_duration(std::time::Duration::from_secs_f64(
                self.warmup_duration_seconds
            ))
        );

        if self.has_failures() {
            warn!(
                "{} of {} requests failed",
                stats.failed_requests, stats.total_requests
            );
        }
    }
}
