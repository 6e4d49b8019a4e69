//! gRPC adapter for the `ComputeService.Compute` unary call.
//!
//! The message types mirror the service's protobuf schema and are encoded
//! with prost; the call goes through tonic's generic unary client so no
//! build-time code generation is needed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::info;

use super::{ProtocolClient, RequestError};
use crate::benchmark::ConfigError;
use crate::workload::WorkloadDescriptor;

/// Fully-qualified method path of the compute RPC
pub const COMPUTE_METHOD_PATH: &str = "/compute.ComputeService/Compute";

/// Largest message accepted in either direction
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Clone, PartialEq, prost::Message)]
pub struct ComputeRequest {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(string, tag = "2")]
    pub mode: String,
    #[prost(int32, tag = "3")]
    pub work_factor: i32,
    #[prost(int32, tag = "4")]
    pub payload_size_bytes: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ComputeResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(string, tag = "2")]
    pub mode: String,
    #[prost(int32, tag = "3")]
    pub work_factor: i32,
    #[prost(int32, tag = "4")]
    pub payload_size_bytes: i32,
    #[prost(string, tag = "5")]
    pub result: String,
    #[prost(double, tag = "6")]
    pub server_processing_ms: f64,
    #[prost(string, tag = "7")]
    pub protocol: String,
    #[prost(string, tag = "8")]
    pub timestamp: String,
}

impl From<&WorkloadDescriptor> for ComputeRequest {
    fn from(workload: &WorkloadDescriptor) -> Self {
        Self {
            request_id: workload.request_id.clone(),
            mode: workload.mode.as_str().to_string(),
            work_factor: i32::try_from(workload.work_factor).unwrap_or(i32::MAX),
            payload_size_bytes: i32::try_from(workload.payload_size_bytes).unwrap_or(i32::MAX),
        }
    }
}

/// gRPC client over a single persistent HTTP/2 channel
///
/// The channel is multiplexed; each request works on a cheap clone of the
/// client handle.
pub struct GrpcClient {
    inner: tonic::client::Grpc<Channel>,
}

impl GrpcClient {
    /// Open the channel to `addr`, failing if the endpoint is unreachable
    ///
    /// Addresses without a scheme (`localhost:9090`) are treated as plain
    /// `http://`.
    pub async fn connect(addr: &str, request_timeout: Duration) -> Result<Self> {
        let uri = normalize_addr(addr);
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| ConfigError::InvalidAddress {
                address: addr.to_string(),
                reason: e.to_string(),
            })?
            .timeout(request_timeout);

        let channel = endpoint
            .connect()
            .await
            .with_context(|| format!("Failed to connect to gRPC endpoint {}", uri))?;
        info!("Connected to gRPC endpoint {}", uri);

        Ok(Self::from_channel(channel))
    }

    /// Wrap an already-established channel
    pub fn from_channel(channel: Channel) -> Self {
        let inner = tonic::client::Grpc::new(channel)
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE);
        Self { inner }
    }
}

fn normalize_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

#[async_trait]
impl ProtocolClient for GrpcClient {
    async fn send(&self, workload: &WorkloadDescriptor) -> Result<(), RequestError> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| RequestError::NotReady(e.to_string()))?;

        let codec: ProstCodec<ComputeRequest, ComputeResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(COMPUTE_METHOD_PATH);
        grpc.unary(tonic::Request::new(ComputeRequest::from(workload)), path, codec)
            .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "grpc"
    }
}
