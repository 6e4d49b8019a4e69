mod common;

use anyhow::Result;
use common::MockTarget;
use std::time::Duration;
use wirefight::{BenchmarkRunner, Mode, Protocol, RunConfig};

fn short_run(protocol: Protocol, http_addr: String) -> RunConfig {
    RunConfig {
        protocol,
        mode: Mode::Cpu,
        work_factor: 10,
        payload_size_bytes: 64,
        concurrency: 4,
        duration: Duration::from_millis(800),
        warmup_duration: Duration::from_millis(200),
        http_addr,
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// Drive the REST endpoint end to end and check the aggregated statistics.
#[tokio::test]
async fn rest_run_against_healthy_target() -> Result<()> {
    let target = MockTarget::start().await?;
    let config = short_run(Protocol::Rest, target.url());

    let runner = BenchmarkRunner::connect(config.clone()).await?;
    let collector = runner.run().await?;
    let stats = collector.aggregate(config.duration);

    assert!(stats.total_requests > 0);
    assert_eq!(stats.failed_requests, 0);
    assert_eq!(stats.error_rate, 0.0);
    assert!(stats.rps > 0.0);
    assert!(stats.min <= stats.p50);
    assert!(stats.p50 <= stats.p90);
    assert!(stats.p90 <= stats.p95);
    assert!(stats.p95 <= stats.p99);
    assert!(stats.p99 <= stats.max);

    // Warmup requests reached the target but were not recorded
    assert!(target.served() > stats.total_requests as u64);
    Ok(())
}

#[tokio::test]
async fn jsonrpc_run_against_healthy_target() -> Result<()> {
    let target = MockTarget::start().await?;
    let config = short_run(Protocol::JsonRpc, target.url());

    let runner = BenchmarkRunner::connect(config.clone()).await?;
    let collector = runner.run().await?;
    let stats = collector.aggregate(config.duration);

    assert!(stats.total_requests > 0);
    assert_eq!(stats.failed_requests, 0);
    assert!(collector.results().iter().all(|r| r.error.is_none()));
    Ok(())
}

/// Every fifth request fails, so about a fifth of the measured requests do.
#[tokio::test]
async fn rest_failures_show_up_in_error_rate() -> Result<()> {
    let target = MockTarget::failing_every(5).await?;
    let config = short_run(Protocol::Rest, target.url());

    let runner = BenchmarkRunner::connect(config.clone()).await?;
    let stats = runner.run().await?.aggregate(config.duration);

    let expected = stats.total_requests as i64 / 5;
    assert!(
        (stats.failed_requests as i64 - expected).abs() <= 1,
        "{} failures out of {}",
        stats.failed_requests,
        stats.total_requests
    );
    assert_eq!(
        stats.successful_requests + stats.failed_requests,
        stats.total_requests
    );
    Ok(())
}

/// A 200 response with a JSON-RPC error object is a failed request.
#[tokio::test]
async fn jsonrpc_error_objects_count_as_failures() -> Result<()> {
    let target = MockTarget::failing_every(5).await?;
    let config = short_run(Protocol::JsonRpc, target.url());

    let runner = BenchmarkRunner::connect(config.clone()).await?;
    let collector = runner.run().await?;
    let stats = collector.aggregate(config.duration);

    assert!(stats.failed_requests > 0);
    let failure = collector
        .results()
        .iter()
        .find(|r| !r.success)
        .and_then(|r| r.error.clone())
        .unwrap_or_default();
    assert!(failure.contains("-32603"), "unexpected error text: {}", failure);
    Ok(())
}

/// An unreachable HTTP target fails every request without aborting the run.
#[tokio::test]
async fn rest_unreachable_target_records_failures() -> Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let mut config = short_run(Protocol::Rest, format!("http://127.0.0.1:{}", port));
    config.concurrency = 1;
    config.warmup_duration = Duration::ZERO;
    config.duration = Duration::from_millis(200);

    let runner = BenchmarkRunner::connect(config.clone()).await?;
    let stats = runner.run().await?.aggregate(config.duration);

    assert!(stats.total_requests > 0);
    assert_eq!(stats.successful_requests, 0);
    assert_eq!(stats.error_rate, 1.0);
    assert_eq!(stats.rps, 0.0);
    assert_eq!(stats.p99, 0.0);
    Ok(())
}
