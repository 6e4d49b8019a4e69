use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{endpoint_url, ProtocolClient, RequestError};
use crate::benchmark::ConfigError;
use crate::workload::WorkloadDescriptor;

/// Path of the REST compute endpoint
pub const COMPUTE_PATH: &str = "/v1/compute";

/// JSON-over-HTTP client: `POST /v1/compute` with the descriptor as the body
pub struct RestClient {
    client: Client,
    endpoint: Url,
}

impl RestClient {
    pub fn new(client: Client, base_addr: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            endpoint: endpoint_url(base_addr, COMPUTE_PATH)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ProtocolClient for RestClient {
    async fn send(&self, workload: &WorkloadDescriptor) -> Result<(), RequestError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(workload)
            .send()
            .await?;

        let status = response.status();
        // Read the body to the end so the connection returns to the pool.
        response.bytes().await?;

        if !status.is_success() {
            return Err(RequestError::Status(status));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
