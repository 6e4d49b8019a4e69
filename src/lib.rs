//! # Wirefight Load Generator Library
//!
//! A concurrent load generator that measures how the same compute service
//! behaves behind three wire protocols: REST (JSON over HTTP), JSON-RPC 2.0
//! and gRPC.
//!
//! ## Architecture Overview
//!
//! - `benchmark`: Run configuration and the phased worker-pool engine
//! - `cli`: Command-line interface and protocol selection
//! - `protocol`: The `ProtocolClient` contract and its three adapters
//! - `workload`: Workload descriptors and the deterministic executor the
//!   target service runs
//! - `metrics`: Per-request results and statistics aggregation
//! - `results`: The JSON result document and run summary
//! - `logging`: Tracing subscriber setup
//! - `utils`: Percentile math and display formatters
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use wirefight::{BenchmarkRunner, BenchmarkResult, Protocol, RunConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RunConfig {
//!         protocol: Protocol::JsonRpc,
//!         concurrency: 20,
//!         duration: Duration::from_secs(10),
//!         warmup_duration: Duration::from_secs(2),
//!         ..Default::default()
//!     };
//!
//!     let runner = BenchmarkRunner::connect(config.clone()).await?;
//!     let collector = runner.run().await?;
//!     let result = BenchmarkResult::new(&config, collector.aggregate(config.duration));
//!
//!     println!("p99 latency: {:.2} ms", result.stats.p99);
//!     Ok(())
//! }
//! ```

/// Run configuration and the warmup/measurement engine
pub mod benchmark;

/// Command-line interface and configuration
pub mod cli;

pub mod logging;

/// Per-request results and statistics aggregation
pub mod metrics;

/// Protocol adapters behind the `ProtocolClient` trait
///
/// Each adapter owns its transport and is shared by every worker:
/// - REST: `POST /v1/compute` with a keep-alive connection pool
/// - JSON-RPC 2.0: `POST /rpc` calling method `compute`
/// - gRPC: unary `ComputeService/Compute` on one persistent channel
pub mod protocol;

/// Result document and human-readable summary
pub mod results;

pub mod utils;

/// Workload descriptors and the deterministic workload executor
pub mod workload;

pub use benchmark::{BenchmarkRunner, ConfigError, RunConfig};
pub use cli::{Args, Protocol};
pub use metrics::{AggregatedStats, RequestResult, ResultCollector};
pub use protocol::{ProtocolClient, RequestError};
pub use results::BenchmarkResult;
pub use workload::{Mode, WorkloadDescriptor};

/// The current version, recorded in every result document
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Iterations (cpu) or milliseconds (io) per request
    pub const WORK_FACTOR: u32 = 100;

    /// Auxiliary payload size in bytes
    pub const PAYLOAD_SIZE: u32 = 256;

    /// Number of concurrent workers
    pub const CONCURRENCY: usize = 10;

    /// Measurement phase length
    pub const DURATION: Duration = Duration::from_secs(30);

    /// Warmup phase length
    pub const WARMUP: Duration = Duration::from_secs(5);

    /// Base URL for REST and JSON-RPC
    pub const HTTP_ADDR: &str = "http://localhost:8080";

    /// gRPC endpoint
    pub const GRPC_ADDR: &str = "localhost:9090";

    /// Upper bound on a single request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}
