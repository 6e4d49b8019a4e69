//! # Wirefight Load Generator - Main Entry Point
//!
//! Drives one protocol endpoint (REST, JSON-RPC or gRPC) of a compute
//! service with a fixed synthetic workload and writes a JSON result document.
//!
//! ## Execution Flow
//!
//! 1. **Parse arguments** and initialize logging
//! 2. **Validate configuration**: an output file is required
//! 3. **Connect**: build the protocol client; a gRPC channel is opened here
//! 4. **Run**: warmup, then measurement, with `concurrency` workers
//! 5. **Report**: aggregate, log the summary, write the result file
//!
//! ## Exit Status
//!
//! - `0`: every measured request succeeded
//! - `1`: at least one measured request failed, or the run could not start

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use wirefight::{
    benchmark::{BenchmarkRunner, ConfigError, RunConfig},
    cli::Args,
    logging::init_logging,
    results::BenchmarkResult,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Held until exit so the file appender flushes.
    let _log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

    match run(&args).await {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(args: &Args) -> Result<ExitCode> {
    let output_file = args.output_file.as_ref().ok_or(ConfigError::MissingOutput)?;
    let config = RunConfig::from_args(args)?;

    info!("Starting Wirefight load generator v{}", wirefight::VERSION);
    info!("  Protocol:     {}", config.protocol);
    info!("  Mode:         {}", config.mode);
    info!("  Work factor:  {}", config.work_factor);
    info!("  Payload size: {} bytes", config.payload_size_bytes);
    info!("  Concurrency:  {}", config.concurrency);
    info!("  Duration:     {:?}", config.duration);
    info!("  Warmup:       {:?}", config.warmup_duration);
    info!("  Output:       {:?}", output_file);

    let runner = BenchmarkRunner::connect(config.clone()).await?;
    let collector = runner.run().await?;

    let stats = collector.aggregate(config.duration);
    let result = BenchmarkResult::new(&config, stats);
    result.log_summary();
    result.save_to_file(output_file)?;

    if result.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        info!("Load test completed successfully");
        Ok(ExitCode::SUCCESS)
    }
}
