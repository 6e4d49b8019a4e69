use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{endpoint_url, ProtocolClient, RequestError};
use crate::benchmark::ConfigError;
use crate::workload::WorkloadDescriptor;

/// Path of the JSON-RPC endpoint
pub const RPC_PATH: &str = "/rpc";

/// Method name invoked on the target
pub const COMPUTE_METHOD: &str = "compute";

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: &'a WorkloadDescriptor,
    pub id: &'a str,
}

impl<'a> RpcRequest<'a> {
    pub fn compute(workload: &'a WorkloadDescriptor) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: COMPUTE_METHOD,
            params: workload,
            id: &workload.request_id,
        }
    }
}

/// JSON-RPC 2.0 response envelope; only the error member decides success
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 client calling `compute` at `POST /rpc`
///
/// A 200 response that carries an `error` object is a failed request.
pub struct JsonRpcClient {
    client: Client,
    endpoint: Url,
}

impl JsonRpcClient {
    pub fn new(client: Client, base_addr: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            endpoint: endpoint_url(base_addr, RPC_PATH)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Turn a raw response body into the request outcome
fn check_response(body: &[u8]) -> Result<(), RequestError> {
    let envelope: RpcResponse = serde_json::from_slice(body)?;
    match envelope.error {
        Some(err) => Err(RequestError::JsonRpc {
            code: err.code,
            message: err.message,
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl ProtocolClient for JsonRpcClient {
    async fn send(&self, workload: &WorkloadDescriptor) -> Result<(), RequestError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RpcRequest::compute(workload))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(RequestError::Status(status));
        }
        check_response(&body)
    }

    fn name(&self) -> &'static str {
        "jsonrpc"
    }
}
