//! # Benchmark Engine Module
//!
//! This module contains the load-generation engine: the run configuration and
//! the `BenchmarkRunner` that drives a pool of workers through a warmup phase
//! and a measurement phase against one protocol client.
//!
//! ## Test Execution Lifecycle
//!
//! 1. **Initialization**: Validate the configuration and open the protocol
//!    client (a gRPC channel is established here; failure aborts the run)
//! 2. **Warmup**: Workers issue requests until the warmup deadline; nothing
//!    is recorded
//! 3. **Measurement**: Workers issue requests until the measurement deadline;
//!    every completed request is streamed to the result collector
//! 4. **Completion**: All workers have returned and the collector has drained
//!    its channel; only then are statistics computed
//!
//! ## Phase Deadlines
//!
//! Workers poll a shared deadline between requests. A request already in
//! flight when the deadline passes is allowed to finish, so a phase can run
//! past its configured duration by up to one request latency per worker.
//! Cutting requests off at the deadline would drop the slowest samples and
//! bias the latency distribution, so the overrun is kept.

use crate::{
    cli::{Args, Protocol},
    metrics::{RequestResult, ResultCollector},
    protocol::{ClientFactory, ProtocolClient},
    workload::{Mode, WorkloadDescriptor},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result channel capacity per worker
const RESULT_BUFFER_PER_WORKER: usize = 10;

/// Invalid run configuration, detected before any phase starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid protocol: {0} (must be rest, jsonrpc, or grpc)")]
    InvalidProtocol(String),

    #[error("invalid mode: {0} (must be cpu or io)")]
    InvalidMode(String),

    #[error("output file is required (use --output)")]
    MissingOutput,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("measurement duration must be greater than zero")]
    ZeroDuration,

    #[error("{field} must not exceed {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Configuration for one load-test run
///
/// Built once before the run and read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Protocol whose endpoint is driven
    pub protocol: Protocol,

    /// Workload mode sent with every request
    pub mode: Mode,

    /// Iterations (cpu) or milliseconds (io) requested per call
    pub work_factor: u32,

    /// Auxiliary payload size the target serializes per call
    pub payload_size_bytes: u32,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Length of the measurement phase; also the divisor for requests per second
    pub duration: Duration,

    /// Length of the warmup phase
    pub warmup_duration: Duration,

    /// Base URL for REST and JSON-RPC
    pub http_addr: String,

    /// Address of the gRPC endpoint
    pub grpc_addr: String,

    /// Upper bound on a single request
    pub request_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Rest,
            mode: Mode::Cpu,
            work_factor: crate::defaults::WORK_FACTOR,
            payload_size_bytes: crate::defaults::PAYLOAD_SIZE,
            concurrency: crate::defaults::CONCURRENCY,
            duration: crate::defaults::DURATION,
            warmup_duration: crate::defaults::WARMUP,
            http_addr: crate::defaults::HTTP_ADDR.to_string(),
            grpc_addr: crate::defaults::GRPC_ADDR.to_string(),
            request_timeout: crate::defaults::REQUEST_TIMEOUT,
        }
    }
}

impl RunConfig {
    /// Create run configuration from CLI arguments
    ///
    /// ## Returns
    /// - `Ok(RunConfig)`: Valid configuration ready for use
    /// - `Err(ConfigError)`: The first validation failure
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            protocol: args.protocol,
            mode: args.mode,
            work_factor: args.work_factor,
            payload_size_bytes: args.payload_size_bytes,
            concurrency: args.concurrency,
            duration: args.duration,
            warmup_duration: args.warmup,
            http_addr: args.http_addr.clone(),
            grpc_addr: args.grpc_addr.clone(),
            request_timeout: args.timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that must hold before any phase starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }

        // The gRPC schema carries both numbers as int32.
        let max = i32::MAX as u64;
        for (field, value) in [
            ("work_factor", self.work_factor),
            ("payload_size_bytes", self.payload_size_bytes),
        ] {
            if u64::from(value) > max {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: u64::from(value),
                    max,
                });
            }
        }

        let address = match self.protocol {
            Protocol::Rest | Protocol::JsonRpc => &self.http_addr,
            Protocol::Grpc => &self.grpc_addr,
        };
        if address.trim().is_empty() {
            return Err(ConfigError::InvalidAddress {
                address: address.clone(),
                reason: "address is empty".to_string(),
            });
        }

        Ok(())
    }

    /// Capacity of the bounded channel between workers and the collector
    pub fn result_buffer_size(&self) -> usize {
        self.concurrency * RESULT_BUFFER_PER_WORKER
    }

    /// Build the descriptor for one request
    pub fn workload(&self, request_id: String) -> WorkloadDescriptor {
        WorkloadDescriptor::new(
            request_id,
            self.mode,
            self.work_factor,
            self.payload_size_bytes,
        )
    }
}

/// Which phase a worker is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Measurement,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Warmup => write!(f, "warmup"),
            Phase::Measurement => write!(f, "measurement"),
        }
    }
}

/// Benchmark runner that drives the worker pool through both phases
///
/// ## Usage Pattern
///
/// ```rust,no_run
/// # use wirefight::benchmark::{BenchmarkRunner, RunConfig};
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = RunConfig::default();
/// let runner = BenchmarkRunner::connect(config.clone()).await?;
/// let collector = runner.run().await?;
/// let stats = collector.aggregate(config.duration);
/// println!("p99 = {:.2} ms", stats.p99);
/// # Ok(())
/// # }
/// ```
pub struct BenchmarkRunner {
    config: RunConfig,
    client: Arc<dyn ProtocolClient>,
}

impl BenchmarkRunner {
    /// Validate `config` and open the client for its protocol
    ///
    /// Configuration and connection errors surface here, before any phase.
    pub async fn connect(config: RunConfig) -> Result<Self> {
        config.validate()?;
        if config.protocol.requires_channel() {
            info!("Opening {} channel to {}", config.protocol, config.grpc_addr);
        }
        let client = ClientFactory::connect(&config)
            .await
            .with_context(|| format!("Failed to create {} client", config.protocol))?;
        Ok(Self { config, client })
    }

    /// Use an existing client instead of building one from the configuration
    pub fn with_client(config: RunConfig, client: Arc<dyn ProtocolClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run warmup then measurement and return the filled collector
    pub async fn run(&self) -> Result<ResultCollector> {
        info!(
            "Starting warmup phase ({:?}) with {} workers",
            self.config.warmup_duration, self.config.concurrency
        );
        self.run_phase(Phase::Warmup, self.config.warmup_duration)
            .await
            .context("Warmup failed")?;

        info!("Starting measurement phase ({:?})", self.config.duration);
        let collector = self
            .run_phase(Phase::Measurement, self.config.duration)
            .await
            .context("Measurement failed")?;

        info!("Measurement complete: {} requests recorded", collector.len());
        Ok(collector)
    }

    /// Run one phase to completion
    ///
    /// For the measurement phase the returned collector holds every result
    /// the workers produced; for warmup it is empty.
    pub async fn run_phase(&self, phase: Phase, duration: Duration) -> Result<ResultCollector> {
        let deadline = Instant::now() + duration;
        let phase_start = Instant::now();

        let (tx, drain) = match phase {
            Phase::Warmup => (None, None),
            Phase::Measurement => {
                let (tx, rx) = mpsc::channel(self.config.result_buffer_size());
                let drain = tokio::spawn(ResultCollector::new().drain(rx));
                (Some(tx), Some(drain))
            }
        };

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.concurrency {
            let client = Arc::clone(&self.client);
            let config = self.config.clone();
            let sink = tx.clone();
            workers.spawn(async move { worker(worker_id, client, config, deadline, sink).await });
        }
        // Only worker handles may keep the channel open.
        drop(tx);

        let mut issued = 0u64;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(count) => issued += count,
                Err(e) => {
                    workers.abort_all();
                    if let Some(drain) = &drain {
                        drain.abort();
                    }
                    return Err(
                        anyhow::Error::new(e).context(format!("A {} worker panicked", phase))
                    );
                }
            }
        }

        let collector = match drain {
            Some(drain) => drain.await.context("Result collector task failed")?,
            None => ResultCollector::new(),
        };

        let elapsed = phase_start.elapsed();
        debug!(
            "{} phase finished: {} requests issued in {:?}",
            phase, issued, elapsed
        );
        if phase == Phase::Measurement && issued as usize != collector.len() {
            warn!(
                "Collector absorbed {} results but workers issued {}",
                collector.len(),
                issued
            );
        }

        Ok(collector)
    }
}

/// Issue requests back to back until `deadline`
///
/// The deadline is only checked between requests. Returns the number of
/// requests issued. Each iteration yields once so a client that completes
/// without suspending cannot starve the other workers.
async fn worker(
    worker_id: usize,
    client: Arc<dyn ProtocolClient>,
    config: RunConfig,
    deadline: Instant,
    sink: Option<mpsc::Sender<RequestResult>>,
) -> u64 {
    let mut sequence = 0u64;

    while Instant::now() < deadline {
        sequence += 1;
        let workload = config.workload(format!("worker-{}-req-{}", worker_id, sequence));

        let start = Instant::now();
        let outcome = client.send(&workload).await;
        let end = Instant::now();

        if let Some(sink) = &sink {
            if sink
                .send(RequestResult::new(start, end, outcome))
                .await
                .is_err()
            {
                warn!("Worker {} lost its result channel; stopping", worker_id);
                break;
            }
        }

        tokio::task::yield_now().await;
    }

    sequence
}
