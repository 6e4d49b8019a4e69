use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::benchmark::ConfigError;
use crate::workload::Mode;

/// Wirefight Load Generator - drive one protocol endpoint with a synthetic workload
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Protocol to test
    #[clap(short = 'p', long, value_enum, default_value_t = Protocol::Rest, help_heading = "Core Options")]
    pub protocol: Protocol,

    /// Workload mode
    #[clap(short = 'm', long, value_enum, default_value_t = Mode::Cpu, help_heading = "Core Options")]
    pub mode: Mode,

    /// Work factor (iterations for cpu, milliseconds for io)
    #[clap(long, default_value_t = crate::defaults::WORK_FACTOR, help_heading = "Core Options")]
    pub work_factor: u32,

    /// Payload size in bytes
    #[clap(long = "payload-size", default_value_t = crate::defaults::PAYLOAD_SIZE, help_heading = "Core Options")]
    pub payload_size_bytes: u32,

    /// Number of concurrent workers
    #[clap(short = 'c', long, default_value_t = crate::defaults::CONCURRENCY)]
    pub concurrency: usize,

    /// Measurement duration (e.g. "30s", "500ms", "2m")
    #[clap(short = 'd', long, value_parser = parse_duration, default_value = "30s")]
    pub duration: Duration,

    /// Warmup duration; results from this phase are discarded
    #[clap(short = 'w', long, value_parser = parse_duration, default_value = "5s")]
    pub warmup: Duration,

    /// Output file for results (JSON format, required)
    #[clap(short = 'o', long = "output")]
    pub output_file: Option<PathBuf>,

    /// Base URL for REST and JSON-RPC
    #[clap(long, default_value = crate::defaults::HTTP_ADDR, help_heading = "Targets")]
    pub http_addr: String,

    /// Address of the gRPC endpoint
    #[clap(long, default_value = crate::defaults::GRPC_ADDR, help_heading = "Targets")]
    pub grpc_addr: String,

    /// Per-request timeout
    #[clap(long, value_parser = parse_duration, default_value = "30s", help_heading = "Targets")]
    pub timeout: Duration,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Also write logs to this file (uncolored)
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            protocol: Protocol::Rest,
            mode: Mode::Cpu,
            work_factor: crate::defaults::WORK_FACTOR,
            payload_size_bytes: crate::defaults::PAYLOAD_SIZE,
            concurrency: crate::defaults::CONCURRENCY,
            duration: crate::defaults::DURATION,
            warmup: crate::defaults::WARMUP,
            output_file: None,
            http_addr: crate::defaults::HTTP_ADDR.to_string(),
            grpc_addr: crate::defaults::GRPC_ADDR.to_string(),
            timeout: crate::defaults::REQUEST_TIMEOUT,
            verbose: false,
            log_file: None,
        }
    }
}

/// Wire protocols the load generator can drive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// JSON over HTTP (`POST /v1/compute`)
    #[clap(name = "rest")]
    Rest,

    /// JSON-RPC 2.0 over HTTP (`POST /rpc`)
    #[clap(name = "jsonrpc")]
    JsonRpc,

    /// gRPC unary call on a persistent channel
    #[clap(name = "grpc")]
    Grpc,
}

impl Protocol {
    /// Short name used on the command line and in result files
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Rest => "rest",
            Protocol::JsonRpc => "jsonrpc",
            Protocol::Grpc => "grpc",
        }
    }

    /// Whether the protocol needs a persistent channel opened before the run
    pub fn requires_channel(&self) -> bool {
        matches!(self, Protocol::Grpc)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Rest => write!(f, "REST"),
            Protocol::JsonRpc => write!(f, "JSON-RPC"),
            Protocol::Grpc => write!(f, "gRPC"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rest" => Ok(Protocol::Rest),
            "jsonrpc" => Ok(Protocol::JsonRpc),
            "grpc" => Ok(Protocol::Grpc),
            other => Err(ConfigError::InvalidProtocol(other.to_string())),
        }
    }
}

/// Parse duration from string (e.g., "10s", "5m", "1h", "250ms")
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    let secs = match unit {
        "ms" => num / 1000.0,
        "s" => num,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Duration::try_from_secs_f64(secs).map_err(|_| format!("Duration out of range: {}", s))
}
