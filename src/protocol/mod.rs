use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::benchmark::{ConfigError, RunConfig};
use crate::cli::Protocol;
use crate::workload::WorkloadDescriptor;

pub mod grpc;
pub mod jsonrpc;
pub mod rest;

pub use grpc::GrpcClient;
pub use jsonrpc::JsonRpcClient;
pub use rest::RestClient;

/// How long an idle pooled HTTP connection is kept around
const HTTP_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Why a single request did not succeed
///
/// These never abort a run; they end up as failed results in the statistics.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    #[error("decode failure: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("rpc error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    #[error("grpc channel not ready: {0}")]
    NotReady(String),

    #[error("grpc status {code:?}: {message}")]
    Grpc { code: tonic::Code, message: String },
}

impl From<tonic::Status> for RequestError {
    fn from(status: tonic::Status) -> Self {
        RequestError::Grpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Uniform "send one request" contract implemented by every protocol
///
/// Implementations own their transport, set up once before the run, and
/// must be safe to share across all workers. A failed attempt is reported
/// as-is; adapters never retry.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Perform one round trip for `workload`
    async fn send(&self, workload: &WorkloadDescriptor) -> Result<(), RequestError>;

    /// Protocol name for identification
    fn name(&self) -> &'static str;
}

/// Creates the client for the protocol selected in a [`RunConfig`]
pub struct ClientFactory;

impl ClientFactory {
    /// Build the client and establish any persistent channel it needs
    ///
    /// A connection failure here is fatal to the run.
    pub async fn connect(config: &RunConfig) -> Result<Arc<dyn ProtocolClient>> {
        debug!("Creating {} client", config.protocol);

        let client: Arc<dyn ProtocolClient> = match config.protocol {
            Protocol::Rest => Arc::new(RestClient::new(
                http_client(config)?,
                &config.http_addr,
            )?),
            Protocol::JsonRpc => Arc::new(JsonRpcClient::new(
                http_client(config)?,
                &config.http_addr,
            )?),
            Protocol::Grpc => Arc::new(
                GrpcClient::connect(&config.grpc_addr, config.request_timeout).await?,
            ),
        };

        Ok(client)
    }
}

/// Keep-alive HTTP client sized for the configured number of workers
fn http_client(config: &RunConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(config.concurrency * 2)
        .pool_idle_timeout(HTTP_IDLE_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Join an HTTP base address and an endpoint path
fn endpoint_url(base: &str, path: &str) -> Result<reqwest::Url, ConfigError> {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    let url = reqwest::Url::parse(&joined).map_err(|e| ConfigError::InvalidAddress {
        address: base.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidAddress {
            address: base.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
