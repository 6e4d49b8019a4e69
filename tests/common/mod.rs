//! In-process compute targets: REST and JSON-RPC over axum, gRPC over tonic.

#![allow(dead_code, unused_imports)]

mod grpc;

pub use grpc::GrpcTarget;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wirefight::workload::{self, WorkloadDescriptor};

#[derive(Default)]
struct TargetState {
    /// Fail every Nth request when set
    fail_every: Option<u64>,
    served: AtomicU64,
}

impl TargetState {
    /// Count the request and report whether it should fail
    fn next_fails(&self) -> bool {
        let n = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        matches!(self.fail_every, Some(every) if n % every == 0)
    }
}

/// Mock compute service bound to an ephemeral local port
pub struct MockTarget {
    addr: std::net::SocketAddr,
    state: Arc<TargetState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockTarget {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(None).await
    }

    /// Start a target that answers every `n`th request with a failure
    pub async fn failing_every(n: u64) -> anyhow::Result<Self> {
        Self::start_with(Some(n)).await
    }

    async fn start_with(fail_every: Option<u64>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(TargetState {
            fail_every,
            served: AtomicU64::new(0),
        });

        let app = Router::new()
            .route("/v1/compute", post(handle_rest))
            .route("/rpc", post(handle_rpc))
            .with_state(Arc::clone(&state));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, warmup included
    pub fn served(&self) -> u64 {
        self.state.served.load(Ordering::SeqCst)
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn run_workload(workload: WorkloadDescriptor) -> Result<Value, String> {
    let echo = workload.clone();
    let output = tokio::task::spawn_blocking(move || workload::execute(&workload))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;

    Ok(json!({
        "request_id": echo.request_id,
        "mode": echo.mode,
        "work_factor": echo.work_factor,
        "payload_size_bytes": echo.payload_size_bytes,
        "result": output.result,
        "server_processing_ms": output.processing_ms(),
    }))
}

async fn handle_rest(
    State(state): State<Arc<TargetState>>,
    Json(workload): Json<WorkloadDescriptor>,
) -> Response {
    if state.next_fails() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "injected failure").into_response();
    }

    match run_workload(workload).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(message) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
    }
}

async fn handle_rpc(State(state): State<Arc<TargetState>>, Json(request): Json<Value>) -> Response {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let rpc_error = |code: i64, message: String| {
        Json(json!({
            "jsonrpc": "2.0",
            "error": { "code": code, "message": message },
            "id": id.clone(),
        }))
        .into_response()
    };

    if state.next_fails() {
        return rpc_error(-32603, "injected failure".to_string());
    }
    if request.get("method").and_then(Value::as_str) != Some("compute") {
        return rpc_error(-32601, "method not found".to_string());
    }

    let params = request.get("params").cloned().unwrap_or(Value::Null);
    let workload: WorkloadDescriptor = match serde_json::from_value(params) {
        Ok(workload) => workload,
        Err(e) => return rpc_error(-32602, e.to_string()),
    };

    match run_workload(workload).await {
        Ok(result) => Json(json!({ "jsonrpc": "2.0", "result": result, "id": id.clone() }))
            .into_response(),
        Err(message) => rpc_error(-32602, message),
    }
}
