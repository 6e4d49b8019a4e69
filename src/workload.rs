//! # Synthetic Workloads
//!
//! A workload descriptor carries the parameters of one synthetic request. The
//! load generator builds a fresh descriptor for every request it sends; the
//! target service hands the same parameters to [`execute`], which either burns
//! CPU with a deterministic hash chain or simulates I/O with chunked sleeps.
//!
//! [`execute`] is blocking. Async callers should run it on a blocking thread
//! (`tokio::task::spawn_blocking`).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Seed for the CPU hash chain, zero-padded to 32 bytes
const CPU_SEED: &[u8] = b"benchmark-seed-data";

/// Type of work the target performs for each request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Deterministic CPU-bound hashing; work factor is an iteration count
    #[clap(name = "cpu")]
    Cpu,

    /// Simulated I/O delay; work factor is milliseconds
    #[clap(name = "io")]
    Io,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Cpu => "cpu",
            Mode::Io => "io",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = crate::benchmark::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cpu" => Ok(Mode::Cpu),
            "io" => Ok(Mode::Io),
            other => Err(crate::benchmark::ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Parameters of a single synthetic request
///
/// Field names match the JSON bodies of the REST and JSON-RPC endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDescriptor {
    pub request_id: String,
    pub mode: Mode,
    pub work_factor: u32,
    pub payload_size_bytes: u32,
}

impl WorkloadDescriptor {
    pub fn new(
        request_id: impl Into<String>,
        mode: Mode,
        work_factor: u32,
        payload_size_bytes: u32,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            mode,
            work_factor,
            payload_size_bytes,
        }
    }

    /// Reject descriptors the executor cannot run
    pub fn validate(&self) -> Result<(), WorkloadError> {
        if self.request_id.trim().is_empty() {
            return Err(WorkloadError::MissingRequestId);
        }
        Ok(())
    }
}

/// Errors returned by the workload executor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("request_id is required")]
    MissingRequestId,
}

/// Result of executing one workload
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadOutput {
    pub result: String,
    /// Time spent inside the executor only
    pub processing_time: Duration,
}

impl WorkloadOutput {
    pub fn processing_ms(&self) -> f64 {
        self.processing_time.as_micros() as f64 / 1000.0
    }
}

/// Run the workload described by `workload`
///
/// Validation happens before any work is done. The measured processing time
/// covers only the work itself.
pub fn execute(workload: &WorkloadDescriptor) -> Result<WorkloadOutput, WorkloadError> {
    let start = Instant::now();
    workload.validate()?;

    let result = match workload.mode {
        Mode::Cpu => cpu_work(workload.work_factor, workload.payload_size_bytes),
        Mode::Io => io_work(workload.work_factor, workload.payload_size_bytes),
    };

    Ok(WorkloadOutput {
        result,
        processing_time: start.elapsed(),
    })
}

fn cpu_work(iterations: u32, payload_size: u32) -> String {
    let mut data = [0u8; 32];
    data[..CPU_SEED.len()].copy_from_slice(CPU_SEED);

    for i in 0..iterations {
        let digest = Sha256::digest(data);
        data.copy_from_slice(&digest);

        if payload_size > 0 && i % 10 == 0 {
            churn_payload(payload_size);
        }
    }

    data[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

fn io_work(sleep_ms: u32, payload_size: u32) -> String {
    let chunks = if sleep_ms < 10 { 1 } else { 10 };
    let chunk = Duration::from_millis(u64::from(sleep_ms / chunks));

    for i in 0..chunks {
        std::thread::sleep(chunk);

        if payload_size > 0 && i % 3 == 0 {
            churn_payload(payload_size);
        }
    }

    format!("slept_{}ms", sleep_ms)
}

/// Serialize and re-parse a generated payload to add encoding overhead
fn churn_payload(size_bytes: u32) {
    let payload = generate_payload(size_bytes);
    if let Ok(encoded) = serde_json::to_vec(&payload) {
        let _ = serde_json::from_slice::<serde_json::Value>(&encoded);
    }
}

/// Build a JSON object whose encoding is roughly `size_bytes` long
pub fn generate_payload(size_bytes: u32) -> serde_json::Value {
    // About half the bytes go to the data string; the rest is JSON overhead.
    let data_len = (size_bytes / 2).max(1) as usize;
    let data: String = (0..data_len).map(|i| (b'A' + (i % 26) as u8) as char).collect();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    serde_json::json!({
        "data": data,
        "size": size_bytes,
        "timestamp": timestamp,
    })
}
