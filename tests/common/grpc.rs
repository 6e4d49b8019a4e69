//! In-process `compute.ComputeService` served with tonic, without generated code.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{http, Body, BoxFuture, Service, StdError};
use tonic::server::{NamedService, UnaryService};
use tonic::transport::Server;
use tonic::{Code, Status};
use wirefight::protocol::grpc::{ComputeRequest, ComputeResponse, COMPUTE_METHOD_PATH};
use wirefight::workload::{self, Mode, WorkloadDescriptor};

#[derive(Clone)]
struct ComputeService {
    reject: bool,
}

impl NamedService for ComputeService {
    const NAME: &'static str = "compute.ComputeService";
}

struct ComputeHandler {
    reject: bool,
}

impl UnaryService<ComputeRequest> for ComputeHandler {
    type Response = ComputeResponse;
    type Future = BoxFuture<tonic::Response<ComputeResponse>, Status>;

    fn call(&mut self, request: tonic::Request<ComputeRequest>) -> Self::Future {
        let reject = self.reject;
        Box::pin(async move {
            if reject {
                return Err(Status::invalid_argument("rejected by target"));
            }

            let request = request.into_inner();
            let mode = request
                .mode
                .parse::<Mode>()
                .map_err(|e| Status::invalid_argument(e.to_string()))?;
            let workload = WorkloadDescriptor::new(
                request.request_id.clone(),
                mode,
                u32::try_from(request.work_factor).unwrap_or(0),
                u32::try_from(request.payload_size_bytes).unwrap_or(0),
            );
            let output = tokio::task::spawn_blocking(move || workload::execute(&workload))
                .await
                .map_err(|e| Status::internal(e.to_string()))?
                .map_err(|e| Status::invalid_argument(e.to_string()))?;
            let server_processing_ms = output.processing_ms();

            Ok(tonic::Response::new(ComputeResponse {
                request_id: request.request_id,
                mode: request.mode,
                work_factor: request.work_factor,
                payload_size_bytes: request.payload_size_bytes,
                result: output.result,
                server_processing_ms,
                protocol: "grpc".to_string(),
                timestamp: String::new(),
            }))
        })
    }
}

impl<B> Service<http::Request<B>> for ComputeService
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        if req.uri().path() != COMPUTE_METHOD_PATH {
            return Box::pin(async {
                Ok(http::Response::builder()
                    .status(200)
                    .header("grpc-status", Code::Unimplemented as i32)
                    .header(http::header::CONTENT_TYPE, "application/grpc")
                    .body(tonic::body::empty_body())
                    .unwrap())
            });
        }

        let handler = ComputeHandler {
            reject: self.reject,
        };
        Box::pin(async move {
            let codec: ProstCodec<ComputeResponse, ComputeRequest> = ProstCodec::default();
            let mut grpc = tonic::server::Grpc::new(codec);
            Ok(grpc.unary(handler, req).await)
        })
    }
}

/// gRPC compute target on a local port
pub struct GrpcTarget {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GrpcTarget {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(false).await
    }

    /// Start a target that answers every call with `InvalidArgument`
    pub async fn rejecting() -> anyhow::Result<Self> {
        Self::start_with(true).await
    }

    async fn start_with(reject: bool) -> anyhow::Result<Self> {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            Server::builder()
                .add_service(ComputeService { reject })
                .serve_with_shutdown(addr, async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        for _ in 0..100 {
            if tokio::net::TcpStream::connect(addr).await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Address without a scheme, as passed to `--grpc-addr`
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for GrpcTarget {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
